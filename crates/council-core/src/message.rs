//! Conversation messages produced by agents

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Model-authored text
    Text,
    /// Echo of a tool result
    ToolResult,
    /// A recoverable failure during the agent's turn
    Error,
}

/// One message in the conversation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    /// Agent name
    pub source: String,
    /// Message body, possibly multi-line
    pub content: String,
    /// Zero-based turn that produced the message
    pub turn: usize,
    /// Message kind
    pub kind: MessageKind,
}

impl TurnMessage {
    /// Model-authored text
    #[must_use]
    pub fn text(source: impl Into<String>, content: impl Into<String>, turn: usize) -> Self {
        Self::new(source, content, turn, MessageKind::Text)
    }

    /// Tool result echo
    #[must_use]
    pub fn tool_result(source: impl Into<String>, content: impl Into<String>, turn: usize) -> Self {
        Self::new(source, content, turn, MessageKind::ToolResult)
    }

    /// Recoverable failure
    #[must_use]
    pub fn error(source: impl Into<String>, content: impl Into<String>, turn: usize) -> Self {
        Self::new(source, content, turn, MessageKind::Error)
    }

    fn new(
        source: impl Into<String>,
        content: impl Into<String>,
        turn: usize,
        kind: MessageKind,
    ) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            turn,
            kind,
        }
    }

    /// `"<source>: <content>"`
    #[must_use]
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TurnMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.content)
    }
}
