//! Snippet Sandbox - isolated execution of visualization code
//!
//! Snippets run in a separate Python interpreter, either as a local child
//! process or inside a throwaway Docker container:
//! - The namespace exposes only `pd`, `alt`, `plt` and `df_latest`
//! - File, eval and import builtins are removed or restricted
//! - Snippet stdout/stderr are captured, never forwarded
//! - Wall-clock timeout covering input and output; the child (and its
//!   container) is killed when it expires
//!
//! Every failure mode is reported as [`SnippetOutcome::Failed`]; `execute`
//! never returns an error.

mod limits;
mod outcome;

pub use limits::ResourceLimits;
pub use outcome::{SnippetOutcome, SnippetReport};

use crate::error::{Error, Result};
use crate::table::Table;
use outcome::parse_harness_output;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const HARNESS: &str = include_str!("harness.py");

/// Where snippets run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxRuntime {
    /// Child interpreter on this host with a cleared environment
    #[default]
    Local,
    /// `docker run --rm --network=none` with resource limits
    Docker,
}

/// Sandbox configuration
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Runtime to use
    pub runtime: SandboxRuntime,
    /// Interpreter for the local runtime
    pub python: String,
    /// Image for the Docker runtime
    pub image: String,
    /// Resource limits (timeout applies to both runtimes)
    pub limits: ResourceLimits,
    /// Largest accepted harness output
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: SandboxRuntime::Local,
            python: "python3".to_string(),
            image: "python:3.12-slim".to_string(),
            limits: ResourceLimits::default(),
            max_output_bytes: 8 * 1024 * 1024,
        }
    }
}

impl SandboxConfig {
    /// Set the runtime
    #[must_use]
    pub fn with_runtime(mut self, runtime: SandboxRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Set the local interpreter
    #[must_use]
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Set the Docker image
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set resource limits
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Runs snippets against the latest table
#[derive(Debug, Clone, Default)]
pub struct SnippetSandbox {
    config: SandboxConfig,
}

impl SnippetSandbox {
    /// Create a sandbox
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Check whether the configured runtime can start
    pub async fn is_available(&self) -> bool {
        let mut command = match self.config.runtime {
            SandboxRuntime::Local => {
                let mut c = Command::new(&self.config.python);
                c.args(["-I", "-c", "pass"]);
                c
            }
            SandboxRuntime::Docker => {
                let mut c = Command::new("docker");
                c.arg("info");
                c
            }
        };
        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Execute `code` with `latest` bound as `df_latest`
    #[instrument(skip(self, code, latest), fields(runtime = ?self.config.runtime, code_len = code.len()))]
    pub async fn execute(&self, code: &str, latest: Option<&Table>) -> SnippetReport {
        let start = Instant::now();
        let report = match self.run(code, latest, start).await {
            Ok(report) => report,
            Err(e) => {
                SnippetReport::failed(e.to_string(), "", start.elapsed().as_millis() as u64)
            }
        };

        match &report.outcome {
            SnippetOutcome::Failed { error } => {
                warn!(error = %error, stderr_len = report.stderr.len(), "Snippet failed");
            }
            outcome => {
                info!(
                    outcome = outcome_name(outcome),
                    duration_ms = report.duration_ms,
                    stdout_len = report.stdout.len(),
                    "Snippet executed"
                );
            }
        }
        report
    }

    async fn run(
        &self,
        code: &str,
        latest: Option<&Table>,
        start: Instant,
    ) -> Result<SnippetReport> {
        let payload = serde_json::to_vec(&serde_json::json!({
            "code": code,
            "frame": latest,
        }))
        .map_err(|e| Error::Sandbox(format!("Failed to encode snippet: {}", e)))?;

        // Kept alive until the child exits.
        let workdir = tempfile::tempdir()?;
        let container = format!("council-{}", Uuid::new_v4());
        let mut command = self.command(workdir.path(), &container);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| Error::Sandbox(format!("Failed to start sandbox: {}", e)))?;

        // The payload can exceed the pipe buffer, so it is fed while the
        // output is drained and both count against the timeout.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&payload).await {
                    debug!(error = %e, "Sandbox closed stdin early");
                }
            }
        };
        let exchange = async move { tokio::join!(feed, child.wait_with_output()).1 };

        let timeout = self.config.limits.timeout;
        let output = match tokio::time::timeout(timeout, exchange).await {
            Ok(output) => output?,
            Err(_) => {
                if matches!(self.config.runtime, SandboxRuntime::Docker) {
                    kill_container(&container).await;
                }
                return Ok(SnippetReport::failed(
                    format!("snippet timed out after {}s", timeout.as_secs_f32()),
                    "",
                    start.elapsed().as_millis() as u64,
                ));
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        if output.stdout.len() > self.config.max_output_bytes {
            return Ok(SnippetReport::failed(
                format!(
                    "snippet output exceeded {} bytes",
                    self.config.max_output_bytes
                ),
                "",
                duration_ms,
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_harness_output(&stdout, duration_ms) {
            Ok(report) => Ok(report),
            Err(reason) => {
                let exit = output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                Ok(SnippetReport::failed(
                    format!("{} (exit status {})", reason, exit),
                    stderr.into_owned(),
                    duration_ms,
                ))
            }
        }
    }

    fn command(&self, workdir: &std::path::Path, container: &str) -> Command {
        match self.config.runtime {
            SandboxRuntime::Local => {
                let mut command = Command::new(&self.config.python);
                command
                    .args(["-I", "-c", HARNESS])
                    .env_clear()
                    .env("PATH", std::env::var_os("PATH").unwrap_or_default())
                    .env("HOME", workdir)
                    .env("MPLBACKEND", "Agg")
                    .env("MPLCONFIGDIR", workdir)
                    .env("PYTHONDONTWRITEBYTECODE", "1")
                    .current_dir(workdir);
                command
            }
            SandboxRuntime::Docker => {
                let mut command = Command::new("docker");
                command.args(self.docker_args(container));
                command
            }
        }
    }

    pub(crate) fn docker_args(&self, container: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            format!("--name={}", container),
            "--network=none".to_string(),
            "--read-only".to_string(),
            "--tmpfs=/tmp".to_string(),
            "--security-opt=no-new-privileges".to_string(),
        ];
        args.extend(self.config.limits.to_docker_args());
        for (key, value) in [
            ("MPLBACKEND", "Agg"),
            ("MPLCONFIGDIR", "/tmp"),
            ("HOME", "/tmp"),
        ] {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push("--workdir=/tmp".to_string());
        args.push(self.config.image.clone());
        args.extend(["python", "-I", "-c", HARNESS].map(String::from));
        args
    }
}

/// Killing the `docker` client leaves the container running.
async fn kill_container(name: &str) {
    let status = Command::new("docker")
        .args(["kill", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => debug!(container = %name, "Killed timed-out container"),
        Ok(_) | Err(_) => warn!(container = %name, "Failed to kill timed-out container"),
    }
}

fn outcome_name(outcome: &SnippetOutcome) -> &'static str {
    match outcome {
        SnippetOutcome::Chart { .. } => "chart",
        SnippetOutcome::Figure { .. } => "figure",
        SnippetOutcome::NoOp => "noop",
        SnippetOutcome::Failed { .. } => "failed",
    }
}
