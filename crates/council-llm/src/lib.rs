//! Council LLM - Chat Completion Provider Abstraction
//!
//! This crate provides the text-generation seam used by Council agents:
//! - Router: the `LlmProvider` trait and a scripted mock provider
//! - OpenAI: chat completions via `async-openai` (any compatible endpoint)
//! - Message / completion / tool-calling types shared by every provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod providers;
pub mod router;
pub mod tools;
pub mod util;

pub use completion::{
    CompletionRequest, CompletionResponse, TokenUsage, ToolCompletionRequest,
    ToolCompletionResponse,
};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use providers::openai::{OpenAiConfig, OpenAiProvider};
pub use router::{LlmProvider, MockProvider};
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
