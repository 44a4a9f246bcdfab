use std::process::Stdio;
use std::time::Instant;

use serde::Serialize;
use tokio::process::Child;

use super::scratch::{count_frames, prepare_scratch_dir};
use super::sentinel::{wait_for_sentinel, SentinelOutcome};
use super::state::{RenderState, StateTracker};
use super::{RenderConfig, RenderJob};
use crate::error::CoreError;
use crate::template::{write_script, SCRIPT_FILE_NAME};
use crate::tool::{spawn_error, ExternalTool};
use crate::types::FrameSize;
use crate::window::WindowResizer;

/// Outcome of one render run.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// [`RenderState::FramesComplete`] or [`RenderState::TimedOut`].
    pub outcome: RenderState,
    /// Every state the run passed through, ending in `Terminated`.
    pub transitions: Vec<RenderState>,
    pub elapsed_ms: u64,
    pub frames_rendered: usize,
    pub scratch_dir: std::path::PathBuf,
    pub window_resized: bool,
    /// `true` once neither the renderer nor anything it started is left
    /// running.
    pub renderer_terminated: bool,
}

impl RenderReport {
    /// Turn a timed-out run into [`CoreError::RenderTimeout`].
    pub fn into_result(self) -> Result<Self, CoreError> {
        if self.outcome.is_success() {
            Ok(self)
        } else {
            Err(CoreError::RenderTimeout {
                waited_secs: self.elapsed_ms / 1000,
                frames_rendered: self.frames_rendered,
                scratch_dir: self.scratch_dir,
            })
        }
    }
}

/// Runs the renderer for one job at a time.
pub struct RenderOrchestrator {
    renderer: ExternalTool,
    config: RenderConfig,
    resizer: Option<Box<dyn WindowResizer>>,
}

impl RenderOrchestrator {
    pub fn new(renderer: ExternalTool, config: RenderConfig) -> Self {
        Self {
            renderer,
            config,
            resizer: None,
        }
    }

    /// Use `resizer` when a run asks for a window size.
    pub fn with_resizer(mut self, resizer: Box<dyn WindowResizer>) -> Self {
        self.resizer = Some(resizer);
        self
    }

    pub fn config(&self) -> RenderConfig {
        self.config
    }

    /// Render `script` into `job.scratch_dir`.
    ///
    /// The scratch directory is purged first and the renderer is killed
    /// before returning, also on timeout. A timeout is reported through
    /// [`RenderReport::outcome`]; use [`RenderReport::into_result`] to treat
    /// it as an error.
    pub async fn run(
        &self,
        job: &RenderJob,
        script: &str,
        window_size: Option<FrameSize>,
    ) -> Result<RenderReport, CoreError> {
        let started = Instant::now();
        let mut state = StateTracker::new();

        prepare_scratch_dir(&job.scratch_dir).await?;
        write_script(&job.scripts_dir, script).await?;
        state.advance(RenderState::ScriptWritten)?;

        let mut child = self.spawn_renderer(job)?;
        // The renderer leads its own process group.
        let group = child.id();
        state.advance(RenderState::RendererRunning)?;
        tracing::info!(
            renderer = %self.renderer.display_name(),
            pid = child.id(),
            scratch_dir = %job.scratch_dir.display(),
            timeout_secs = self.config.timeout.as_secs(),
            "Renderer started",
        );

        let (sentinel, window_resized) = self.await_frames(job, window_size, &mut child).await;
        let outcome = match sentinel {
            SentinelOutcome::Appeared => RenderState::FramesComplete,
            SentinelOutcome::TimedOut => RenderState::TimedOut,
        };
        state.advance(outcome)?;
        let renderer_terminated = terminate(&mut child, group).await;
        state.advance(RenderState::Terminated)?;

        let frames_rendered = count_frames(&job.scratch_dir).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if outcome.is_success() {
            tracing::info!(frames_rendered, elapsed_ms, "Rendering complete");
        } else {
            tracing::warn!(
                frames_rendered,
                elapsed_ms,
                scratch_dir = %job.scratch_dir.display(),
                "Rendering timed out",
            );
        }

        Ok(RenderReport {
            outcome,
            transitions: state.history().to_vec(),
            elapsed_ms,
            frames_rendered,
            scratch_dir: job.scratch_dir.clone(),
            window_resized,
            renderer_terminated,
        })
    }

    fn spawn_renderer(&self, job: &RenderJob) -> Result<Child, CoreError> {
        let mut cmd = self.renderer.command();
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.arg("--startup-script")
            .arg(SCRIPT_FILE_NAME)
            .arg("--screenshot-dir")
            .arg(&job.scratch_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.renderer, "renderer", e))
    }

    /// Wait for the final sentinel, resizing the window after the first
    /// frame when a window size was requested.
    async fn await_frames(
        &self,
        job: &RenderJob,
        window_size: Option<FrameSize>,
        child: &mut Child,
    ) -> (SentinelOutcome, bool) {
        let RenderConfig {
            poll_interval,
            timeout,
        } = self.config;

        let resize = match (window_size, self.resizer.as_deref()) {
            (Some(size), Some(resizer)) => Some((size, resizer)),
            (Some(size), None) => {
                tracing::warn!(%size, "No window resizer available, window size unchanged");
                None
            }
            (None, _) => None,
        };

        let mut window_resized = false;
        if let Some((size, resizer)) = resize {
            let first =
                wait_for_sentinel(&job.first_sentinel(), poll_interval, timeout, child).await;
            if first == SentinelOutcome::TimedOut {
                return (first, false);
            }
            match resizer.resize(size).await {
                Ok(()) => window_resized = true,
                Err(e) => tracing::warn!(error = %e, %size, "Window resize failed, continuing"),
            }
        }

        // Fresh budget after the resize.
        let outcome =
            wait_for_sentinel(&job.final_sentinel(), poll_interval, timeout, child).await;
        (outcome, window_resized)
    }
}

/// Kill the renderer and every process it started.
///
/// Returns whether nothing is left running. A launcher that already exited
/// only counts as terminated once its process group is gone too.
async fn terminate(child: &mut Child, group: Option<u32>) -> bool {
    let group_killed = kill_process_group(group);

    if let Ok(Some(status)) = child.try_wait() {
        tracing::debug!(%status, group_killed, "Renderer launcher already exited");
        if !group_killed {
            tracing::warn!("Renderer launcher exited, processes it started may still be running");
        }
        return group_killed;
    }
    match child.kill().await {
        Ok(()) => {
            tracing::info!(group_killed, "Renderer terminated");
            group_killed || cfg!(not(unix))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to kill renderer");
            false
        }
    }
}

/// SIGKILL the process group `group`. A group with no members left counts
/// as killed.
#[cfg(unix)]
fn kill_process_group(group: Option<u32>) -> bool {
    let Some(pgid) = group.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return false;
    };
    // Safety: killpg only sends a signal and touches no memory.
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret == 0 {
        return true;
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return true;
    }
    tracing::error!(error = %err, pgid, "Failed to kill renderer process group");
    false
}

#[cfg(not(unix))]
fn kill_process_group(_group: Option<u32>) -> bool {
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
