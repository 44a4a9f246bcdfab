//! Invocation details for external programs (renderer, encoder, player).

use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;

use crate::error::CoreError;

/// An external program plus arguments that always precede the
/// stage-specific ones.
///
/// Leading arguments let a wrapper stand in for the real tool, e.g.
/// `bash fake_renderer.sh` in tests or `flatpak run org.stellarium.Stellarium`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A fresh command with the program and leading arguments set.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }

    /// Resolve the program on `PATH` (or verify an explicit path).
    ///
    /// `what` names the tool in the error, e.g. `"video encoder"`.
    pub fn locate(&self, what: &str) -> Result<PathBuf, CoreError> {
        which::which(&self.program).map_err(|e| {
            CoreError::PrerequisiteMissing(format!(
                "{what} '{}' not found: {e}",
                self.program.display()
            ))
        })
    }

    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Map a spawn failure to a prerequisite error when the program is missing.
pub(crate) fn spawn_error(tool: &ExternalTool, what: &str, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::PrerequisiteMissing(format!(
            "{what} '{}' could not be started: {err}",
            tool.program.display()
        ))
    } else {
        CoreError::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_program_is_prerequisite_error() {
        let tool = ExternalTool::new("skylapse-definitely-not-installed");
        let err = tool.locate("video encoder").unwrap_err();
        assert_matches!(&err, CoreError::PrerequisiteMissing(msg) if msg.contains("video encoder"));
    }

    #[cfg(unix)]
    #[test]
    fn shell_is_located() {
        let tool = ExternalTool::new("sh");
        assert!(tool.locate("shell").is_ok());
    }

    #[test]
    fn display_name_strips_directories() {
        let tool = ExternalTool::new("/usr/bin/ffmpeg");
        assert_eq!(tool.display_name(), "ffmpeg");
    }

    #[test]
    fn spawn_not_found_maps_to_prerequisite() {
        let tool = ExternalTool::new("vlc");
        let err = spawn_error(
            &tool,
            "video player",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_matches!(err, CoreError::PrerequisiteMissing(_));

        let err = spawn_error(&tool, "video player", std::io::Error::other("boom"));
        assert_matches!(err, CoreError::Io(_));
    }
}
