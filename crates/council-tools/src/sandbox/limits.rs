//! Resource limits for sandboxed execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits for sandboxed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory limit in bytes (default: 512MB)
    pub memory_bytes: u64,
    /// CPU quota (percentage of one core, default: 100%)
    pub cpu_percent: u32,
    /// Maximum execution time
    pub timeout: Duration,
    /// Maximum number of processes
    pub max_pids: u32,
    /// Disable swap
    pub no_swap: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: 512 * 1024 * 1024,
            cpu_percent: 100,
            timeout: Duration::from_secs(30),
            max_pids: 64,
            no_swap: true,
        }
    }
}

impl ResourceLimits {
    /// Set memory limit in megabytes
    #[must_use]
    pub fn with_memory_mb(mut self, mb: u64) -> Self {
        self.memory_bytes = mb * 1024 * 1024;
        self
    }

    /// Set CPU quota (capped at 100)
    #[must_use]
    pub fn with_cpu_percent(mut self, percent: u32) -> Self {
        self.cpu_percent = percent.min(100);
        self
    }

    /// Set wall-clock timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert to Docker resource arguments
    #[must_use]
    pub fn to_docker_args(&self) -> Vec<String> {
        let mut args = vec![format!("--memory={}b", self.memory_bytes)];

        if self.no_swap {
            args.push(format!("--memory-swap={}b", self.memory_bytes));
        }

        // microseconds per 100ms period
        let cpu_quota = (self.cpu_percent as u64) * 1000;
        args.push(format!("--cpu-quota={}", cpu_quota));
        args.push("--cpu-period=100000".to_string());
        args.push(format!("--pids-limit={}", self.max_pids));

        args
    }
}
