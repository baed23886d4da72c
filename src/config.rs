//! Application configuration
//!
//! Layered with the `config` crate: embedded defaults, then optional
//! `config/default.toml` and `config/local.toml` on disk, then `COUNCIL_*`
//! environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use council_core::RunOptions;
use council_tools::{AccessMode, ResourceLimits, SandboxConfig, SandboxRuntime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub sandbox: SandboxSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    council_llm::providers::openai::DEFAULT_MODEL.to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            timeout_secs: default_llm_timeout(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub access_mode: AccessMode,
}

fn default_max_turns() -> usize {
    council_core::DEFAULT_MAX_TURNS
}

fn default_tool_timeout() -> u64 {
    30
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            tool_timeout_secs: default_tool_timeout(),
            access_mode: AccessMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSettings {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    council_tools::DEFAULT_CACHE_CAPACITY
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub runtime: SandboxRuntime,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_true() -> bool {
    true
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_image() -> String {
    "python:3.12-slim".to_string()
}

fn default_sandbox_timeout() -> u64 {
    30
}

fn default_memory_mb() -> u64 {
    512
}

fn default_max_output_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            runtime: SandboxRuntime::default(),
            python: default_python(),
            image: default_image(),
            timeout_secs: default_sandbox_timeout(),
            memory_mb: default_memory_mb(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Run options with CLI overrides applied
    pub fn run_options(&self, model: Option<&str>, max_turns: Option<usize>) -> RunOptions {
        let mut options = RunOptions::new(model.unwrap_or(&self.llm.model))
            .with_max_turns(max_turns.unwrap_or(self.orchestrator.max_turns))
            .with_access_mode(self.orchestrator.access_mode)
            .with_tool_timeout(Duration::from_secs(self.orchestrator.tool_timeout_secs));
        if let Some(temperature) = self.llm.temperature {
            options = options.with_temperature(temperature);
        }
        options
    }

    /// Sandbox configuration, or `None` when snippet execution is disabled
    pub fn sandbox_config(&self) -> Option<SandboxConfig> {
        if !self.sandbox.enabled {
            return None;
        }
        let limits = ResourceLimits::default()
            .with_memory_mb(self.sandbox.memory_mb)
            .with_timeout(Duration::from_secs(self.sandbox.timeout_secs));
        let mut config = SandboxConfig::default()
            .with_runtime(self.sandbox.runtime)
            .with_python(&self.sandbox.python)
            .with_image(&self.sandbox.image)
            .with_limits(limits);
        config.max_output_bytes = self.sandbox.max_output_bytes;
        Some(config)
    }
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority), e.g. COUNCIL_LLM__MODEL
        .add_source(
            Environment::with_prefix("COUNCIL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded() -> AppConfig {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_embedded_defaults_match_code_defaults() {
        let config = embedded();
        let defaults = AppConfig::default();

        assert_eq!(config.llm.model, defaults.llm.model);
        assert_eq!(config.orchestrator.max_turns, 10);
        assert_eq!(config.orchestrator.access_mode, AccessMode::ReadOnly);
        assert_eq!(config.schema.cache_capacity, 32);
        assert_eq!(config.sandbox.runtime, SandboxRuntime::Local);
        assert_eq!(config.sandbox.max_output_bytes, defaults.sandbox.max_output_bytes);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_run_options_overrides() {
        let config = embedded();

        let options = config.run_options(Some("gpt-4o"), Some(3));
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.max_turns, 3);

        let options = config.run_options(None, None);
        assert_eq!(options.model, "gpt-4o-mini");
        assert_eq!(options.max_turns, 10);
        assert_eq!(options.tool_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_sandbox_config() {
        let mut config = embedded();
        let sandbox = config.sandbox_config().unwrap();
        assert_eq!(sandbox.limits.timeout, Duration::from_secs(30));
        assert_eq!(sandbox.limits.memory_bytes, 512 * 1024 * 1024);

        config.sandbox.enabled = false;
        assert!(config.sandbox_config().is_none());
    }
}
