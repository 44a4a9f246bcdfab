//! Resizing the renderer's window.
//!
//! The planetarium takes screenshots at its window size, so when the user
//! asks for a specific window size it has to be forced once the window
//! exists. Only X11 desktops with `wmctrl` are supported; elsewhere the
//! resize is skipped with a warning.

use std::process::Stdio;

use async_trait::async_trait;
use regex::Regex;

use crate::error::CoreError;
use crate::tool::{spawn_error, ExternalTool};
use crate::types::FrameSize;

/// Title of the renderer's main window, e.g. `Stellarium 24.2.0`.
pub const RENDERER_WINDOW_TITLE: &str = r"^Stellarium \d+\.\d+\.\d+$";

/// Forces the renderer window to a given size.
#[async_trait]
pub trait WindowResizer: Send + Sync {
    async fn resize(&self, size: FrameSize) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// wmctrl
// ---------------------------------------------------------------------------

/// One line of `wmctrl -l` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEntry {
    pub id: String,
    pub title: String,
}

/// Resizes the renderer window through `wmctrl` (EWMH window managers).
pub struct WmctrlResizer {
    wmctrl: ExternalTool,
    title: Regex,
}

impl WmctrlResizer {
    pub fn new(wmctrl: ExternalTool) -> Result<Self, CoreError> {
        let title = Regex::new(RENDERER_WINDOW_TITLE)
            .map_err(|e| CoreError::WindowResize(format!("bad title pattern: {e}")))?;
        Ok(Self { wmctrl, title })
    }

    async fn wmctrl(&self, args: &[&str]) -> Result<String, CoreError> {
        let output = self
            .wmctrl
            .command()
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.wmctrl, "window manager control", e))?;

        if !output.status.success() {
            return Err(CoreError::WindowResize(format!(
                "wmctrl {} exited with {:?}: {}",
                args.join(" "),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WindowResizer for WmctrlResizer {
    async fn resize(&self, size: FrameSize) -> Result<(), CoreError> {
        let listing = self.wmctrl(&["-l"]).await?;
        let window = find_window(&listing, &self.title).ok_or_else(|| {
            CoreError::WindowResize("renderer window not found".to_string())
        })?;

        // A maximized or fullscreen window ignores move/resize requests.
        self.wmctrl(&[
            "-i",
            "-r",
            &window.id,
            "-b",
            "remove,maximized_vert,maximized_horz",
        ])
        .await?;
        self.wmctrl(&["-i", "-r", &window.id, "-b", "remove,fullscreen"])
            .await?;

        let geometry = format!("0,0,0,{},{}", size.width, size.height);
        self.wmctrl(&["-i", "-r", &window.id, "-e", &geometry]).await?;

        tracing::info!(
            window = %window.id,
            title = %window.title,
            %size,
            "Resized renderer window",
        );
        Ok(())
    }
}

/// Parse `wmctrl -l` output (`<id> <desktop> <host> <title>` per line).
pub fn parse_window_list(listing: &str) -> Vec<WindowEntry> {
    listing
        .lines()
        .filter_map(|line| {
            let (id, rest) = next_field(line)?;
            if !id.starts_with("0x") {
                return None;
            }
            let (_desktop, rest) = next_field(rest)?;
            let (_host, rest) = next_field(rest)?;
            Some(WindowEntry {
                id: id.to_string(),
                title: rest.trim().to_string(),
            })
        })
        .collect()
}

/// Split off the next whitespace-delimited field.
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some(s.split_at(end))
}

/// First window whose full title matches `title`.
pub fn find_window(listing: &str, title: &Regex) -> Option<WindowEntry> {
    parse_window_list(listing)
        .into_iter()
        .find(|w| title.is_match(&w.title))
}

// ---------------------------------------------------------------------------
// Unsupported platforms
// ---------------------------------------------------------------------------

/// Resizer for platforms without a supported window manager interface.
pub struct UnsupportedResizer;

#[async_trait]
impl WindowResizer for UnsupportedResizer {
    async fn resize(&self, _size: FrameSize) -> Result<(), CoreError> {
        Err(CoreError::WindowResize(format!(
            "window resizing is not supported on {}",
            std::env::consts::OS
        )))
    }
}

/// The resizer for the current platform.
pub fn platform_resizer() -> Result<Box<dyn WindowResizer>, CoreError> {
    if cfg!(target_os = "linux") {
        Ok(Box::new(WmctrlResizer::new(ExternalTool::new("wmctrl"))?))
    } else {
        Ok(Box::new(UnsupportedResizer))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
