//! Run state

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Lifecycle of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Built but not yet polled
    #[default]
    Idle,
    /// Invoking `next_agent` for `turn`
    Running {
        /// Zero-based turn counter
        turn: usize,
        /// Agent being invoked
        next_agent: String,
    },
    /// Turn budget exhausted
    Completed {
        /// Turns taken
        turns: usize,
    },
    /// Stopped early
    Aborted {
        /// Turn that was about to run or in flight
        turn: usize,
        /// Why the run stopped
        reason: String,
    },
}

impl RunState {
    /// Whether the run can no longer advance
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed { .. } | RunState::Aborted { .. })
    }
}

/// Shared view of a run's state, readable while the stream is consumed
#[derive(Debug, Clone, Default)]
pub struct StateHandle(Arc<Mutex<RunState>>);

impl StateHandle {
    /// Current state
    #[must_use]
    pub fn get(&self) -> RunState {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set(&self, state: RunState) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Guard that marks a still-running run as aborted when dropped
    pub(crate) fn abort_on_drop(&self) -> AbortOnDrop {
        AbortOnDrop(self.clone())
    }
}

/// Held by a running stream; the run never reports `Running` after its
/// stream is gone.
pub(crate) struct AbortOnDrop(StateHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        let mut state = self.0 .0.lock().unwrap_or_else(|e| e.into_inner());
        if let RunState::Running { turn, .. } = *state {
            *state = RunState::Aborted {
                turn,
                reason: "dropped".to_string(),
            };
        }
    }
}
