//! Orchestrator configuration

use tokio_util::sync::CancellationToken;

/// Turn budget when none is configured
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Configuration for a round-robin run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Agent invocations before the run completes
    pub max_turns: usize,
    /// Checked between turns and raced against the turn in flight
    pub cancel: CancellationToken,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            cancel: CancellationToken::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the turn budget
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
