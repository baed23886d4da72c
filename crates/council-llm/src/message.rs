//! Chat message types
//!
//! Agents only ever send instructions, the task, their own earlier output
//! and other agents' output, so three roles cover the conversation.

use serde::{Deserialize, Serialize};

/// Who a message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Agent instructions
    System,
    /// Task text and other agents' output
    User,
    /// The calling agent's own output
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// Participant name, used to tell agents apart in `user` messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Attach a participant name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Message::system("plan").role, MessageRole::System);
        assert_eq!(Message::user("task").role, MessageRole::User);

        let other = Message::user("VizAgent: CHART_JSON: {}").with_name("VizAgent");
        assert_eq!(other.name.as_deref(), Some("VizAgent"));
        assert_eq!(Message::assistant("done").role, MessageRole::Assistant);
    }

    #[test]
    fn test_name_skipped_when_absent() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));

        let json = serde_json::to_value(Message::user("hi").with_name("QueryAgent")).unwrap();
        assert_eq!(json["name"], "QueryAgent");
    }
}
