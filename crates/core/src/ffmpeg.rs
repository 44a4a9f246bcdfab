//! Encoding rendered frames into a video and playing it back.
//!
//! Both tools are plain subprocesses waited on without a timeout; a hung
//! encoder or player stalls the pipeline.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use crate::error::CoreError;
use crate::render::frame_pattern_in;
use crate::tool::{spawn_error, ExternalTool};
use crate::types::FrameSize;

/// Constant rate factor passed to the encoder.
pub const DEFAULT_CRF: u8 = 12;

/// Pixel format understood by most players.
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Runs the encoder and the player.
#[derive(Debug, Clone)]
pub struct VideoAssembler {
    encoder: ExternalTool,
    player: ExternalTool,
    crf: u8,
}

impl VideoAssembler {
    pub fn new(encoder: ExternalTool, player: ExternalTool) -> Self {
        Self {
            encoder,
            player,
            crf: DEFAULT_CRF,
        }
    }

    pub fn encoder(&self) -> &ExternalTool {
        &self.encoder
    }

    pub fn player(&self) -> &ExternalTool {
        &self.player
    }

    /// Encode the frames in `frame_dir` into `out_path`, overwriting it.
    ///
    /// On failure the frames are left in place.
    pub async fn assemble(
        &self,
        frame_dir: &Path,
        frame_rate: f64,
        video_size: FrameSize,
        out_path: &Path,
    ) -> Result<(), CoreError> {
        let args = encoder_args(frame_dir, frame_rate, video_size, self.crf, out_path);
        tracing::info!(
            encoder = %self.encoder.display_name(),
            frame_dir = %frame_dir.display(),
            frame_rate,
            %video_size,
            output = %out_path.display(),
            "Encoding video",
        );

        let output = self
            .encoder
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.encoder, "video encoder", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                exit_code = ?output.status.code(),
                frame_dir = %frame_dir.display(),
                "Encoder failed, frames kept for inspection",
            );
            return Err(CoreError::EncodingFailed {
                exit_code: output.status.code(),
                stderr: stderr_tail(&stderr),
            });
        }

        tracing::info!(output = %out_path.display(), "Video written");
        Ok(())
    }

    /// Play `video` in a loop and block until the player exits.
    pub async fn play(&self, video: &Path) -> Result<(), CoreError> {
        tracing::info!(
            player = %self.player.display_name(),
            video = %video.display(),
            "Starting playback",
        );

        let status = self
            .player
            .command()
            .arg("--repeat")
            .arg(video)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| spawn_error(&self.player, "video player", e))?;

        if !status.success() {
            return Err(CoreError::PlaybackFailed {
                exit_code: status.code(),
            });
        }
        Ok(())
    }
}

/// Encoder arguments: image sequence in, H.264-compatible video out.
///
/// `-framerate` sets the input rate so every frame is kept; `-s` after the
/// input scales the output.
pub fn encoder_args(
    frame_dir: &Path,
    frame_rate: f64,
    video_size: FrameSize,
    crf: u8,
    out_path: &Path,
) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-framerate".into(),
        frame_rate.to_string().into(),
        "-f".into(),
        "image2".into(),
        "-i".into(),
        frame_pattern_in(frame_dir).into_os_string(),
        "-s".into(),
        video_size.to_string().into(),
        "-crf".into(),
        crf.to_string().into(),
        "-pix_fmt".into(),
        PIXEL_FORMAT.into(),
        out_path.as_os_str().to_os_string(),
    ]
}

/// Last lines of encoder stderr; the banner and per-frame progress are noise.
fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 20;
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
