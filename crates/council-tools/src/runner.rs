//! Runner - bounded tool execution
//!
//! Errors raised by a tool become a failed [`ToolResult`] so the calling
//! agent can explain them. Lookup, validation and timeout failures are
//! returned as `Err`.

use crate::error::{Error, Result};
use crate::registry::{ToolRegistry, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout when a call sets none
    pub default_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl RunnerConfig {
    /// Settings with `default_timeout`
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Overrides the runner default
    pub timeout: Option<Duration>,
}

impl ExecutionOptions {
    /// Options with a timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// A finished call
#[derive(Debug)]
pub struct ExecutionResult {
    /// Outcome
    pub result: ToolResult,
    /// Tool that ran
    pub tool_name: String,
}

/// Executes registered tools
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Runner over `registry`
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Runner with default settings
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, RunnerConfig::default())
    }

    /// Registered tools
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute with default options
    pub async fn execute(&self, tool_name: &str, input: Value) -> Result<ExecutionResult> {
        self.execute_with_options(tool_name, input, ExecutionOptions::default())
            .await
    }

    /// Execute `tool_name` with `input`
    #[instrument(skip(self, input, options), fields(tool = %tool_name))]
    pub async fn execute_with_options(
        &self,
        tool_name: &str,
        input: Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| Error::NotFound(tool_name.to_string()))?;
        tool.validate_input(&input)?;

        let limit = options.timeout.unwrap_or(self.config.default_timeout);
        let start = Instant::now();
        debug!(timeout_ms = limit.as_millis() as u64, "Executing tool");

        let result = match tokio::time::timeout(limit, tool.execute(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "Tool reported an error");
                ToolResult::failure(e.to_string(), start.elapsed().as_millis() as u64)
            }
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Tool timed out");
                return Err(Error::Timeout(start.elapsed().as_millis() as u64));
            }
        };

        debug!(success = result.success, duration_ms = result.duration_ms, "Tool finished");
        Ok(ExecutionResult {
            result,
            tool_name: tool_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tool, ToolDefinition};
    use serde_json::json;

    struct SleepyTool {
        definition: ToolDefinition,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Tool for SleepyTool {
        fn definition(&self) -> &ToolDefinition {
            &self.definition
        }

        async fn execute(&self, _input: Value) -> Result<ToolResult> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolResult::success(json!("done"), 0))
        }
    }

    struct BrokenSqlTool(ToolDefinition);

    #[async_trait::async_trait]
    impl Tool for BrokenSqlTool {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn execute(&self, _input: Value) -> Result<ToolResult> {
            Err(Error::Execution("near \"SELCT\": syntax error".to_string()))
        }
    }

    fn runner_with(tool: Arc<dyn Tool>) -> ToolRunner {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        ToolRunner::with_defaults(Arc::new(registry))
    }

    fn sleepy(delay: Duration) -> Arc<dyn Tool> {
        Arc::new(SleepyTool {
            definition: ToolDefinition::new("slow", "sleeps"),
            delay,
        })
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let runner = ToolRunner::with_defaults(Arc::new(ToolRegistry::new()));
        let result = runner.execute("missing", json!({})).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failed_result() {
        let runner = runner_with(Arc::new(BrokenSqlTool(ToolDefinition::new("run_sql", "x"))));

        let exec = runner.execute("run_sql", json!({})).await.unwrap();
        assert_eq!(exec.tool_name, "run_sql");
        assert!(!exec.result.success);
        assert!(exec.result.error.unwrap().contains("syntax error"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = runner_with(sleepy(Duration::from_millis(200)));

        let result = runner
            .execute_with_options(
                "slow",
                json!({}),
                ExecutionOptions::with_timeout(Duration::from_millis(10)),
            )
            .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_execution() {
        let runner = runner_with(sleepy(Duration::from_secs(10)));

        let result = runner.execute("slow", json!([1, 2])).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
