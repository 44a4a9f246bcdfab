use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;

use skylapse_core::error::CoreError;
use skylapse_core::prerequisites::Planetarium;
use skylapse_core::render::RenderConfig;
use skylapse_core::tool::ExternalTool;

use crate::geocode::DEFAULT_GEOCODER_URL;

/// Name of the per-run frame directory under the system temp directory.
const SCRATCH_DIR_NAME: &str = "skylapse_frames";

/// Where the external tools live and how long to wait for them.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub planetarium: Planetarium,
    /// Directory holding `<name>.ssc` script templates.
    pub template_dir: PathBuf,
    /// Recreated empty for every run.
    pub scratch_dir: PathBuf,
    pub encoder: ExternalTool,
    pub player: ExternalTool,
    pub render: RenderConfig,
    /// Added to the sunset when the start time is resolved automatically.
    pub sunset_offset: TimeDelta,
    pub geocoder_url: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                             |
    /// |--------------------------------|-------------------------------------|
    /// | `SKYLAPSE_RENDERER`            | platform renderer path              |
    /// | `SKYLAPSE_RENDERER_ARGS`       | none (whitespace separated)         |
    /// | `SKYLAPSE_USER_DATA_DIR`       | platform user data directory        |
    /// | `SKYLAPSE_TEMPLATE_DIR`        | `./script`                          |
    /// | `SKYLAPSE_SCRATCH_DIR`         | `<temp>/skylapse_frames`            |
    /// | `SKYLAPSE_ENCODER`             | `ffmpeg`                            |
    /// | `SKYLAPSE_PLAYER`              | `vlc`                               |
    /// | `SKYLAPSE_RENDER_TIMEOUT_SECS` | `600`                               |
    /// | `SKYLAPSE_POLL_INTERVAL_MS`    | `1000`                              |
    /// | `SKYLAPSE_SUNSET_OFFSET_SECS`  | `0`                                 |
    /// | `SKYLAPSE_GEOCODER_URL`        | Nominatim search endpoint           |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables read from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let home = var("HOME")
            .or_else(|| var("USERPROFILE"))
            .map(PathBuf::from);
        let mut planetarium = match (&home, var("SKYLAPSE_USER_DATA_DIR")) {
            (_, Some(dir)) => Planetarium {
                user_data_dir: PathBuf::from(dir),
                ..Planetarium::platform_default(home.as_deref().unwrap_or(Path::new("")))
            },
            (Some(home), None) => Planetarium::platform_default(home),
            (None, None) => {
                return Err(CoreError::PrerequisiteMissing(
                    "cannot determine the home directory; set SKYLAPSE_USER_DATA_DIR".to_string(),
                ))
            }
        };
        if let Some(renderer) = var("SKYLAPSE_RENDERER") {
            planetarium.binary.program = PathBuf::from(renderer);
        }
        if let Some(args) = var("SKYLAPSE_RENDERER_ARGS") {
            planetarium.binary.leading_args = args.split_whitespace().map(Into::into).collect();
        }

        let template_dir = var("SKYLAPSE_TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("script"));
        let scratch_dir = var("SKYLAPSE_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR_NAME));
        let encoder = ExternalTool::new(var("SKYLAPSE_ENCODER").unwrap_or_else(|| "ffmpeg".into()));
        let player = ExternalTool::new(var("SKYLAPSE_PLAYER").unwrap_or_else(|| "vlc".into()));

        let timeout_secs: u64 = parse_var(&var, "SKYLAPSE_RENDER_TIMEOUT_SECS", 600)?;
        let poll_ms: u64 = parse_var(&var, "SKYLAPSE_POLL_INTERVAL_MS", 1000)?;
        if timeout_secs == 0 || poll_ms == 0 {
            return Err(CoreError::InvalidArgument(
                "SKYLAPSE_RENDER_TIMEOUT_SECS and SKYLAPSE_POLL_INTERVAL_MS must be greater than 0"
                    .to_string(),
            ));
        }
        let offset_secs: i64 = parse_var(&var, "SKYLAPSE_SUNSET_OFFSET_SECS", 0)?;
        let sunset_offset = TimeDelta::try_seconds(offset_secs).ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "SKYLAPSE_SUNSET_OFFSET_SECS out of range (got {offset_secs})"
            ))
        })?;

        let geocoder_url =
            var("SKYLAPSE_GEOCODER_URL").unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string());

        Ok(Self {
            planetarium,
            template_dir,
            scratch_dir,
            encoder,
            player,
            render: RenderConfig {
                poll_interval: Duration::from_millis(poll_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
            sunset_offset,
            geocoder_url,
        })
    }
}

/// Parse variable `name`, falling back to `default` when unset.
fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, CoreError>
where
    T: FromStr,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            CoreError::InvalidArgument(format!("{name} must be a number (got '{raw}')"))
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
