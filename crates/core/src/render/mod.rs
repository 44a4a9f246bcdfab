//! Driving the planetarium renderer until every frame is on disk.
//!
//! A run writes the startup script, launches the renderer, waits for the
//! sentinel files the script writes next to the frames, and kills the
//! renderer whatever the outcome. See [`RenderOrchestrator::run`].

mod orchestrator;
mod scratch;
mod sentinel;
mod state;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use orchestrator::{RenderOrchestrator, RenderReport};
pub use scratch::{count_frames, prepare_scratch_dir};
pub use sentinel::{wait_for_sentinel, SentinelOutcome};
pub use state::RenderState;

/// File name prefix of rendered frames (`frame_000.png`, `frame_001.png`, ...).
pub const FRAME_PREFIX: &str = "frame_";

/// Encoder input pattern matching the frame names.
pub const FRAME_PATTERN: &str = "frame_%03d.png";

/// Written by the script once the first frame is on disk.
pub const FIRST_SENTINEL: &str = "first.png";

/// Written by the script after the last frame.
pub const FINAL_SENTINEL: &str = "final.png";

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-sentinel timeout used when none is configured.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(600);

/// Polling behaviour of a render run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub poll_interval: Duration,
    /// Budget for each sentinel wait. The wait for the final sentinel after
    /// a window resize gets a fresh budget.
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

/// Filesystem locations of one render run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// Receives the frames and sentinels; recreated empty for every run.
    pub scratch_dir: PathBuf,
    /// The renderer's user scripts directory.
    pub scripts_dir: PathBuf,
}

impl RenderJob {
    pub fn new(scratch_dir: impl Into<PathBuf>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn first_sentinel(&self) -> PathBuf {
        self.scratch_dir.join(FIRST_SENTINEL)
    }

    pub fn final_sentinel(&self) -> PathBuf {
        self.scratch_dir.join(FINAL_SENTINEL)
    }

    /// Encoder input pattern inside the scratch directory.
    pub fn frame_pattern(&self) -> PathBuf {
        frame_pattern_in(&self.scratch_dir)
    }
}

/// Encoder input pattern for frames stored in `dir`.
pub fn frame_pattern_in(dir: &Path) -> PathBuf {
    dir.join(FRAME_PATTERN)
}
