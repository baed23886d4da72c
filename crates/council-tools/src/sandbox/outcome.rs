//! Snippet execution results

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of the single result line written by the harness
pub(crate) const RESULT_MARKER: &str = "\u{1e}council-result ";

/// What a snippet produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnippetOutcome {
    /// `chart` was bound: a declarative chart spec
    Chart {
        /// Spec as produced by `to_dict()` or the bound dict
        spec: Value,
    },
    /// `fig` was bound: a rendered image
    Figure {
        /// PNG bytes, base64 encoded
        png_base64: String,
    },
    /// Neither binding was set
    NoOp,
    /// The snippet raised, timed out or the sandbox could not run it
    Failed {
        /// Short description
        error: String,
    },
}

impl SnippetOutcome {
    /// Whether this is a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome plus captured streams.
///
/// `stdout`/`stderr` are for diagnostics only and are never forwarded to
/// the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetReport {
    /// Result of the run
    pub outcome: SnippetOutcome,
    /// Snippet standard output
    pub stdout: String,
    /// Snippet standard error (or harness traceback on failure)
    pub stderr: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl SnippetReport {
    pub(crate) fn failed(
        error: impl Into<String>,
        stderr: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            outcome: SnippetOutcome::Failed {
                error: error.into(),
            },
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum HarnessReply {
    Chart {
        spec: Value,
    },
    Figure {
        png_base64: String,
    },
    None,
    Error {
        error: String,
        #[serde(default)]
        traceback: String,
    },
}

#[derive(Debug, Deserialize)]
struct HarnessEnvelope {
    #[serde(flatten)]
    reply: HarnessReply,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

/// Find and decode the harness result line in raw process stdout
pub(crate) fn parse_harness_output(raw: &str, duration_ms: u64) -> Result<SnippetReport, String> {
    let line = raw
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix(RESULT_MARKER))
        .ok_or_else(|| "sandbox produced no result".to_string())?;

    let envelope: HarnessEnvelope =
        serde_json::from_str(line).map_err(|e| format!("malformed sandbox result: {}", e))?;

    let (outcome, stderr) = match envelope.reply {
        HarnessReply::Chart { spec } => (SnippetOutcome::Chart { spec }, envelope.stderr),
        HarnessReply::Figure { png_base64 } => {
            (SnippetOutcome::Figure { png_base64 }, envelope.stderr)
        }
        HarnessReply::None => (SnippetOutcome::NoOp, envelope.stderr),
        HarnessReply::Error { error, traceback } => {
            let mut stderr = envelope.stderr;
            if !traceback.is_empty() {
                if !stderr.is_empty() {
                    stderr.push('\n');
                }
                stderr.push_str(&traceback);
            }
            (SnippetOutcome::Failed { error }, stderr)
        }
    };

    Ok(SnippetReport {
        outcome,
        stdout: envelope.stdout,
        stderr,
        duration_ms,
    })
}
