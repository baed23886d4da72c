//! Session - consumer-side state for one question
//!
//! The dispatcher runs every streamed message through the directive parser,
//! keeps the latest table for snippets, runs snippets in the sandbox and
//! accumulates what a dashboard needs to render the answer.

#[cfg(test)]
mod tests;

use crate::directives::{extract, Directive, DirectiveKind, Fragment};
use crate::error::{Error, Result};
use crate::message::{MessageKind, TurnMessage};
use chrono::{DateTime, Utc};
use council_tools::{SnippetOutcome, SnippetSandbox, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Artifact produced by running a snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutedArtifact {
    /// Declarative chart bound as `chart`
    Chart {
        /// Chart spec
        spec: Value,
    },
    /// Rendered figure bound as `fig`
    Figure {
        /// PNG bytes, base64 encoded
        png_base64: String,
    },
}

/// Something the consumer should render or report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Prose line from an agent
    Insight {
        /// Authoring agent
        source: String,
        /// Line text
        text: String,
    },
    /// Chart spec to render
    Chart {
        /// Vega-Lite spec
        spec: Value,
    },
    /// A chart marker whose payload did not parse
    ChartError {
        /// Parse error
        error: String,
    },
    /// A new latest table
    Frame {
        /// Markdown preview
        preview_markdown: String,
        /// Full row count
        rows: usize,
    },
    /// A snippet produced an artifact
    Executed {
        /// The artifact
        artifact: ExecutedArtifact,
    },
    /// A snippet could not be extracted or failed to run
    ExecutionFailed {
        /// Error text
        error: String,
    },
    /// A snippet ran without binding `chart` or `fig`
    SnippetNoOp,
    /// Snippet execution is disabled
    SnippetSkipped,
    /// The query tool reported an error
    ToolFailed {
        /// Agent that called the tool
        source: String,
        /// Tool error
        error: String,
    },
    /// An agent turn failed without ending the run
    AgentError {
        /// Agent whose turn failed
        source: String,
        /// Error text
        message: String,
    },
    /// The run ended with a fatal error
    RunError {
        /// Error text
        message: String,
    },
}

/// Everything collected for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Question as asked
    pub question: String,
    /// Insight lines formatted `**<source>**: <text>`
    pub insights: Vec<String>,
    /// Chart specs emitted by agents
    pub charts: Vec<Value>,
    /// Artifacts produced by snippets
    pub executed: Vec<ExecutedArtifact>,
    /// Tables returned by the query tool, in order
    pub frames: Vec<Table>,
    /// Recoverable and fatal errors, in order
    pub errors: Vec<String>,
    /// When the session started
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    /// Empty state for `question`
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            insights: Vec::new(),
            charts: Vec::new(),
            executed: Vec::new(),
            frames: Vec::new(),
            errors: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// JSON payload for a dashboard. Tables are in split orientation.
    pub fn to_dashboard_payload(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize session: {}", e)))
    }
}

/// Routes streamed messages into a [`SessionState`]
#[derive(Debug)]
pub struct SessionDispatcher {
    sandbox: Option<SnippetSandbox>,
    state: SessionState,
    latest: Option<Table>,
}

impl SessionDispatcher {
    /// Create a dispatcher. Without a sandbox, snippets are skipped.
    #[must_use]
    pub fn new(question: impl Into<String>, sandbox: Option<SnippetSandbox>) -> Self {
        Self {
            sandbox,
            state: SessionState::new(question),
            latest: None,
        }
    }

    /// Latest table, handed to snippets as `df_latest`
    #[must_use]
    pub fn latest_frame(&self) -> Option<&Table> {
        self.latest.as_ref()
    }

    /// State collected so far
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Finish the session
    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Record the fatal error that ended the run
    pub fn record_run_error(&mut self, error: &Error) -> SessionEvent {
        let message = error.to_string();
        self.state.errors.push(message.clone());
        SessionEvent::RunError { message }
    }

    /// Process one message, in stream order.
    pub async fn ingest(&mut self, message: &TurnMessage) -> Vec<SessionEvent> {
        match message.kind {
            MessageKind::Error => {
                self.state
                    .errors
                    .push(format!("{}: {}", message.source, message.content));
                return vec![SessionEvent::AgentError {
                    source: message.source.clone(),
                    message: message.content.clone(),
                }];
            }
            MessageKind::ToolResult => {
                if let Some(error) = tool_error(&message.content) {
                    self.state
                        .errors
                        .push(format!("{}: {}", message.source, error));
                    return vec![SessionEvent::ToolFailed {
                        source: message.source.clone(),
                        error,
                    }];
                }
            }
            MessageKind::Text => {}
        }

        let fragments = extract(&message.source, &message.content);
        let mut events = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            events.push(self.apply(fragment).await);
        }
        events
    }

    async fn apply(&mut self, fragment: Fragment) -> SessionEvent {
        match fragment {
            Fragment::Insight { source, text } => {
                self.state.insights.push(format!("**{}**: {}", source, text));
                SessionEvent::Insight { source, text }
            }
            Fragment::Directive(Directive::ChartSpec(spec)) => {
                self.state.charts.push(spec.clone());
                SessionEvent::Chart { spec }
            }
            Fragment::Directive(Directive::TablePayload(payload)) => {
                let rows = payload.data.len();
                self.state.frames.push(payload.data.clone());
                self.latest = Some(payload.data);
                SessionEvent::Frame {
                    preview_markdown: payload.preview_markdown,
                    rows,
                }
            }
            Fragment::Directive(Directive::CodeSnippet(code)) => self.execute(&code).await,
            Fragment::Malformed { kind, error, raw } => {
                debug!(?kind, raw_len = raw.len(), "Malformed directive");
                self.state.errors.push(format!("{:?} directive: {}", kind, error));
                match kind {
                    DirectiveKind::Chart => SessionEvent::ChartError { error },
                    DirectiveKind::Code | DirectiveKind::Table => {
                        SessionEvent::ExecutionFailed { error }
                    }
                }
            }
        }
    }

    async fn execute(&mut self, code: &str) -> SessionEvent {
        let Some(sandbox) = &self.sandbox else {
            debug!("Snippet execution disabled");
            return SessionEvent::SnippetSkipped;
        };

        let report = sandbox.execute(code, self.latest.as_ref()).await;
        if !report.stdout.is_empty() || !report.stderr.is_empty() {
            debug!(stdout = %report.stdout, stderr = %report.stderr, "Snippet output");
        }

        let artifact = match report.outcome {
            SnippetOutcome::Chart { spec } => ExecutedArtifact::Chart { spec },
            SnippetOutcome::Figure { png_base64 } => ExecutedArtifact::Figure { png_base64 },
            SnippetOutcome::NoOp => return SessionEvent::SnippetNoOp,
            SnippetOutcome::Failed { error } => {
                warn!(error = %error, "Snippet execution failed");
                self.state.errors.push(format!("snippet: {}", error));
                return SessionEvent::ExecutionFailed { error };
            }
        };

        self.state.executed.push(artifact.clone());
        SessionEvent::Executed { artifact }
    }
}

fn tool_error(content: &str) -> Option<String> {
    let value: Value = serde_json::from_str(content.trim()).ok()?;
    if value.get("data_json").is_some() {
        return None;
    }
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}
