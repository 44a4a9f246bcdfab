//! Checks that run before the pipeline touches the filesystem.
//!
//! Every missing dependency is reported up front, naming the dependency,
//! so a run never leaves a half-written script or a purged scratch
//! directory behind because of a missing tool.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::ffmpeg::VideoAssembler;
use crate::template::ScriptTemplate;
use crate::tool::ExternalTool;

/// Name of the scripts folder inside the renderer's user data directory.
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// Where the planetarium is installed and where it keeps user data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planetarium {
    pub binary: ExternalTool,
    pub user_data_dir: PathBuf,
}

impl Planetarium {
    /// Default install locations for the current platform, relative to the
    /// user's home directory.
    pub fn platform_default(home: &Path) -> Self {
        if cfg!(windows) {
            Self {
                binary: ExternalTool::new(r"C:\Program Files\Stellarium\stellarium.exe"),
                user_data_dir: home.join("AppData").join("Roaming").join("Stellarium"),
            }
        } else if cfg!(target_os = "macos") {
            Self {
                binary: ExternalTool::new(
                    "/Applications/Stellarium.app/Contents/MacOS/stellarium",
                ),
                user_data_dir: home
                    .join("Library")
                    .join("Application Support")
                    .join("Stellarium"),
            }
        } else {
            Self {
                binary: ExternalTool::new("stellarium"),
                user_data_dir: home.join(".stellarium"),
            }
        }
    }

    /// Folder the renderer loads startup scripts from.
    pub fn scripts_dir(&self) -> PathBuf {
        self.user_data_dir.join(SCRIPTS_DIR_NAME)
    }
}

/// Everything the checks resolved.
#[derive(Debug, Clone)]
pub struct Prerequisites {
    pub template: ScriptTemplate,
    pub renderer: PathBuf,
    pub encoder: PathBuf,
    /// Only resolved when playback was requested.
    pub player: Option<PathBuf>,
}

/// Verify every external dependency of a run. Reads only.
pub async fn check_prerequisites(
    template_dir: &Path,
    template_name: &str,
    planetarium: &Planetarium,
    assembler: &VideoAssembler,
    with_playback: bool,
) -> Result<Prerequisites, CoreError> {
    let template = ScriptTemplate::load(template_dir, template_name).await?;
    let renderer = planetarium.binary.locate("renderer")?;

    if !tokio::fs::metadata(&planetarium.user_data_dir)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        return Err(CoreError::PrerequisiteMissing(format!(
            "renderer user data directory '{}' not found; start the renderer once to create it",
            planetarium.user_data_dir.display()
        )));
    }

    let encoder = assembler.encoder().locate("video encoder")?;
    let player = if with_playback {
        Some(assembler.player().locate("video player")?)
    } else {
        None
    };

    tracing::info!(
        template = %template.path.display(),
        renderer = %renderer.display(),
        encoder = %encoder.display(),
        player = ?player,
        "Prerequisites satisfied",
    );

    Ok(Prerequisites {
        template,
        renderer,
        encoder,
        player,
    })
}

/// Create the renderer's scripts folder if it does not exist yet.
pub async fn ensure_scripts_dir(planetarium: &Planetarium) -> Result<PathBuf, CoreError> {
    let dir = planetarium.scripts_dir();
    if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
        tracing::info!(dir = %dir.display(), "Creating renderer scripts directory");
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
