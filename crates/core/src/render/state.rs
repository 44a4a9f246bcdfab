//! Render run states and the transitions allowed between them.

use serde::Serialize;

use crate::error::CoreError;

/// Lifecycle of one render run.
///
/// ```text
/// Idle -> ScriptWritten -> RendererRunning -> FramesComplete -> Terminated
///                                          \-> TimedOut ------/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Idle,
    ScriptWritten,
    RendererRunning,
    FramesComplete,
    TimedOut,
    Terminated,
}

impl RenderState {
    /// States reachable from `self` in one step.
    pub fn valid_transitions(self) -> &'static [RenderState] {
        use RenderState::*;
        match self {
            Idle => &[ScriptWritten],
            ScriptWritten => &[RendererRunning],
            RendererRunning => &[FramesComplete, TimedOut],
            FramesComplete | TimedOut => &[Terminated],
            Terminated => &[],
        }
    }

    pub fn can_transition_to(self, next: RenderState) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Whether the renderer produced every frame.
    pub fn is_success(self) -> bool {
        self == RenderState::FramesComplete
    }
}

/// A [`RenderState`] plus the path taken to reach it.
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    current: RenderState,
    history: Vec<RenderState>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: RenderState::Idle,
            history: vec![RenderState::Idle],
        }
    }

    pub(crate) fn current(&self) -> RenderState {
        self.current
    }

    pub(crate) fn history(&self) -> &[RenderState] {
        &self.history
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub(crate) fn advance(&mut self, next: RenderState) -> Result<(), CoreError> {
        if !self.current.can_transition_to(next) {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid render state transition: {:?} -> {:?}",
                self.current, next
            )));
        }
        tracing::debug!(from = ?self.current, to = ?next, "Render state transition");
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
