use std::path::PathBuf;

use chrono::NaiveDate;

/// Errors raised by every pipeline stage.
///
/// Each message names the stage it came from so the binary can print it
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Start time: no sunset at lon={longitude}, lat={latitude} on {date} \
         (polar day or polar night); specify an explicit time"
    )]
    NoEventOnThisDate {
        longitude: f64,
        latitude: f64,
        date: NaiveDate,
    },

    #[error("Script template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error(
        "Rendering timed out after {waited_secs}s with {frames_rendered} frames in {}",
        .scratch_dir.display()
    )]
    RenderTimeout {
        waited_secs: u64,
        frames_rendered: usize,
        scratch_dir: PathBuf,
    },

    #[error("Encoding failed (exit code {exit_code:?}): {stderr}")]
    EncodingFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Playback failed (exit code {exit_code:?})")]
    PlaybackFailed { exit_code: Option<i32> },

    #[error("Window resize failed: {0}")]
    WindowResize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Short stage label used in user-facing error lines.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "arguments",
            Self::NoEventOnThisDate { .. } => "start time",
            Self::TemplateNotFound(_) | Self::PrerequisiteMissing(_) => "prerequisites",
            Self::RenderTimeout { .. } | Self::WindowResize(_) => "rendering",
            Self::EncodingFailed { .. } => "encoding",
            Self::PlaybackFailed { .. } => "playback",
            Self::Io(_) => "filesystem",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
