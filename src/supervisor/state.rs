//! Run state machine.

use std::fmt;
use std::time::Duration;

/// Why the supervisor began terminating the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// No output on either stream for longer than the idle timeout.
    IdleTimeout { idle: Duration },
    /// The caller's cancellation token fired.
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout { idle } => {
                write!(f, "no activity for {}s", (idle.as_millis() + 500) / 1000)
            }
            Self::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

/// Current state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Running,
    Terminating {
        reason: TerminationReason,
    },
    Completed,
    Failed,
}

impl RunState {
    /// Returns true once the run has resolved.
    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State machine for one run.
///
/// Termination starts at most once and the run resolves at most once. Calls
/// made after either point return `false` and change nothing.
#[derive(Debug, Clone, Default)]
pub struct RunStateMachine {
    state: RunState,
}

impl RunStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Reason recorded by the first termination trigger, if any.
    #[must_use]
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.state {
            RunState::Terminating { reason } => Some(reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminating(&self) -> bool {
        matches!(self.state, RunState::Terminating { .. })
    }

    /// Enter `Terminating`. Only the first trigger while running wins.
    pub fn begin_termination(&mut self, reason: TerminationReason) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.transition(RunState::Terminating { reason });
        true
    }

    /// Resolve the run. Only the first resolution takes effect.
    pub fn resolve(&mut self, success: bool) -> bool {
        if self.state.is_resolved() {
            return false;
        }
        self.transition(if success {
            RunState::Completed
        } else {
            RunState::Failed
        });
        true
    }

    fn transition(&mut self, new_state: RunState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
    }
}
