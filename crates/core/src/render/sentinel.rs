//! Polling for sentinel files written by the renderer.

use std::path::Path;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::Instant;

/// How a wait for a sentinel file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelOutcome {
    Appeared,
    TimedOut,
}

/// Poll for `path` every `interval` until it exists or `timeout` elapses.
///
/// The deadline is checked before and after every sleep and the last sleep
/// is shortened to end exactly at the deadline, so a timeout is never
/// reported early. The renderer exiting does not end the wait: some
/// launchers hand off to another process and return immediately.
pub async fn wait_for_sentinel(
    path: &Path,
    interval: Duration,
    timeout: Duration,
    renderer: &mut Child,
) -> SentinelOutcome {
    let deadline = Instant::now() + timeout;
    let mut exit_reported = false;

    loop {
        if sentinel_exists(path).await {
            tracing::debug!(sentinel = %path.display(), "Sentinel appeared");
            return SentinelOutcome::Appeared;
        }

        let now = Instant::now();
        if now >= deadline {
            return SentinelOutcome::TimedOut;
        }

        if !exit_reported {
            match renderer.try_wait() {
                Ok(Some(status)) => {
                    tracing::warn!(
                        %status,
                        sentinel = %path.display(),
                        "Renderer exited before writing the sentinel, still waiting",
                    );
                    exit_reported = true;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to query renderer status");
                    exit_reported = true;
                }
            }
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

async fn sentinel_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
