//! Error types for council-core
//!
//! This module provides error types and user-friendly error formatting.

use council_llm::util::sanitize_error_for_user;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The data store could not be opened or read
    #[error("store error: {0}")]
    Store(String),

    /// Invalid team or run configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] council_llm::Error),

    /// Tool execution error
    #[error("tool error: {0}")]
    Tool(#[from] council_tools::Error),

    /// Internal error (runtime, serialization, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error ends the run.
    ///
    /// Store failures and an unreachable text-generation backend abort;
    /// everything else is reported inline for the turn that hit it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Store(_) => true,
            Error::Llm(e) => e.is_unreachable(),
            Error::Tool(council_tools::Error::Store(_)) => true,
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Store(msg) => format!("🗄️ Could not open the database: {}", msg),
            Error::Configuration(msg) => format!("⚙️ Configuration error: {}", msg),
            Error::Llm(council_llm::Error::NotConfigured(msg)) => {
                format!("🔑 Language model is not configured: {}", msg)
            }
            Error::Llm(council_llm::Error::Network(_)) | Error::Llm(council_llm::Error::Timeout(_)) => {
                "🌐 The language model service is unreachable.".to_string()
            }
            Error::Llm(council_llm::Error::RateLimit) => {
                "⏳ Rate limit exceeded. Please try again later.".to_string()
            }
            Error::Llm(e) => format!("🤖 LLM error: {}", sanitize_error_for_user(&e.to_string())),
            Error::Tool(e) => format!("🔧 Tool error: {}", e),
            Error::Internal(msg) => format!("❌ Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Store(_) | Error::Tool(council_tools::Error::Store(_)) => Some(
                "💡 Check that --db points to an existing SQLite file you can read.".to_string(),
            ),
            Error::Configuration(_) => {
                Some("💡 Check config/default.toml and COUNCIL_* environment variables.".to_string())
            }
            Error::Llm(council_llm::Error::NotConfigured(_)) => {
                Some("💡 Set OPENAI_API_KEY (and OPENAI_BASE_URL for other endpoints).".to_string())
            }
            Error::Llm(council_llm::Error::Network(_)) | Error::Llm(council_llm::Error::Timeout(_)) => {
                Some("💡 Check your internet connection and OPENAI_BASE_URL.".to_string())
            }
            Error::Llm(council_llm::Error::RateLimit) => {
                Some("💡 Try a smaller model or fewer turns.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}
