//! Render script generation.
//!
//! A template is a planetarium script containing `$NAME$` placeholders.
//! [`generate`] fills them from a validated request in a single
//! left-to-right pass: replacement text is never rescanned, so a caption
//! that happens to contain `$DATE$` stays literal and the order in which
//! placeholders appear cannot change the result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::request::SimulationRequest;
use crate::start_time::ResolvedStartTime;

/// File name the generated script is written to inside the planetarium's
/// scripts directory. The renderer is told to run exactly this file.
pub const SCRIPT_FILE_NAME: &str = "skylapse.ssc";

/// Extension of template files in the template directory.
pub const TEMPLATE_EXTENSION: &str = "ssc";

/// Start date format understood by the renderer (`core.setDate(..., "utc")`).
const SCRIPT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const PH_FRAME_FOLDER: &str = "FRAME_FOLDER";
pub const PH_AZIMUTH: &str = "AZ";
pub const PH_ALTITUDE: &str = "ALT";
pub const PH_LATITUDE: &str = "LAT";
pub const PH_LONGITUDE: &str = "LONG";
pub const PH_TITLE: &str = "TITLE";
pub const PH_DATE: &str = "DATE";
pub const PH_TIMESPAN: &str = "TIMESPAN";
pub const PH_FOV: &str = "FOV";
pub const PH_DELTAT: &str = "DELTAT";
pub const PH_PLANET: &str = "PLANET";

/// Every placeholder name [`generate`] fills.
pub const ALL_PLACEHOLDERS: &[&str] = &[
    PH_FRAME_FOLDER,
    PH_AZIMUTH,
    PH_ALTITUDE,
    PH_LATITUDE,
    PH_LONGITUDE,
    PH_TITLE,
    PH_DATE,
    PH_TIMESPAN,
    PH_FOV,
    PH_DELTAT,
    PH_PLANET,
];

/// A script template loaded from disk.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

impl ScriptTemplate {
    /// Path of template `name` inside `template_dir`.
    pub fn path_for(template_dir: &Path, name: &str) -> PathBuf {
        template_dir.join(format!("{name}.{TEMPLATE_EXTENSION}"))
    }

    /// Load template `name` from `template_dir`.
    pub async fn load(template_dir: &Path, name: &str) -> Result<Self, CoreError> {
        let path = Self::path_for(template_dir, name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(CoreError::TemplateNotFound(path));
        }
        let text = tokio::fs::read_to_string(&path).await?;
        Ok(Self {
            name: name.to_string(),
            path,
            text,
        })
    }
}

/// Fill every placeholder of `template` for `request`.
pub fn generate(
    template: &ScriptTemplate,
    request: &SimulationRequest,
    start: &ResolvedStartTime,
    scratch_dir: &Path,
) -> String {
    let location = request.location();
    let view = request.view();

    let values: HashMap<&str, String> = HashMap::from([
        (
            PH_FRAME_FOLDER,
            escape_path(&scratch_dir.to_string_lossy(), std::path::MAIN_SEPARATOR),
        ),
        (PH_AZIMUTH, script_number(view.azimuth)),
        (PH_ALTITUDE, script_number(view.altitude)),
        (PH_LATITUDE, script_number(location.latitude)),
        (PH_LONGITUDE, script_number(location.longitude)),
        (PH_TITLE, escape_string_literal(request.caption())),
        (PH_DATE, start.start.format(SCRIPT_DATE_FORMAT).to_string()),
        (PH_TIMESPAN, script_number(request.total_span_hours())),
        (PH_FOV, script_number(view.fov)),
        (PH_DELTAT, script_number(request.cadence_secs())),
        (PH_PLANET, escape_string_literal(request.body())),
    ]);

    substitute(&template.text, |name| values.get(name).cloned())
}

/// Write the generated script into `scripts_dir`, replacing any previous one.
pub async fn write_script(scripts_dir: &Path, script: &str) -> Result<PathBuf, CoreError> {
    let path = scripts_dir.join(SCRIPT_FILE_NAME);
    tokio::fs::write(&path, script).await?;
    tracing::debug!(path = %path.display(), bytes = script.len(), "Wrote render script");
    Ok(path)
}

/// Replace `$NAME$` tokens for which `lookup` returns a value.
///
/// Unknown tokens and stray `$` characters are copied unchanged.
pub fn substitute(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('$') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let replaced = after_open.find('$').and_then(|close| {
            let name = &after_open[..close];
            if is_placeholder_name(name) {
                lookup(name).map(|value| (value, close))
            } else {
                None
            }
        });

        match replaced {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after_open[close + 1..];
            }
            None => {
                out.push('$');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Double backslash separators; the path lands inside a quoted string literal.
pub fn escape_path(path: &str, separator: char) -> String {
    if separator == '\\' {
        path.replace('\\', "\\\\")
    } else {
        path.to_string()
    }
}

/// Escape text for a double-quoted script string literal.
fn escape_string_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Format a number the way the script expects: always with a decimal point.
///
/// `2.0` stays `2.0` rather than `2`.
pub fn script_number(value: f64) -> String {
    format!("{value:?}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
