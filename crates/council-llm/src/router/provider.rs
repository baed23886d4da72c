//! The provider seam agents generate through

use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::Result;

/// A chat completion backend shared by every agent of a run.
///
/// Implementations must be safe to call from concurrent runs.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Generate text
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate with functions on offer
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}
