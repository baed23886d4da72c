//! Mock LLM Provider for testing
//!
//! Responses are served from FIFO queues, then from an optional responder
//! closure, then fall back to a fixed `"mock response"`. Every request is
//! recorded so tests can assert on call order and prompts.

use super::provider::LlmProvider;
use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::{Error, Result};
use crate::tools::ToolCall;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const MOCK_MODEL: &str = "mock-model";

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// A mock LLM provider that returns scripted responses.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse>>>,
    tool_responses: Mutex<VecDeque<Result<ToolCompletionResponse>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
    complete_calls: AtomicUsize,
    tool_calls: AtomicUsize,
}

fn text_response(content: impl Into<String>) -> CompletionResponse {
    CompletionResponse {
        content: content.into(),
        usage: None,
        finish_reason: Some("stop".to_string()),
        model: MOCK_MODEL.to_string(),
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unscripted requests by calling `responder`.
    #[must_use]
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue a text completion.
    pub fn add_response(&self, content: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(text_response(content)));
    }

    /// Queue a failing text completion.
    pub fn add_error(&self, error: Error) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Queue a tool-enabled completion.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.tool_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(response));
    }

    /// Queue a tool-enabled completion that requests a single tool call.
    pub fn add_tool_call(&self, name: &str, arguments: serde_json::Value) {
        let index = self.tool_responses.lock().unwrap_or_else(|e| e.into_inner()).len();
        self.add_tool_response(ToolCompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: format!("call_{}", index),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            usage: None,
            finish_reason: Some("tool_calls".to_string()),
            model: MOCK_MODEL.to_string(),
        });
    }

    /// Queue a failing tool-enabled completion.
    pub fn add_tool_error(&self, error: Error) {
        self.tool_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Number of `complete` calls served.
    #[must_use]
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Number of `complete_with_tools` calls served.
    #[must_use]
    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    /// Total calls of either kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.complete_calls() + self.tool_calls()
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, request: &CompletionRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
    }

    fn respond(&self, request: &CompletionRequest) -> Result<String> {
        match &self.responder {
            Some(responder) => responder(request),
            None => Ok("mock response".to_string()),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.record(&request);

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match queued {
            Some(resp) => resp,
            None => self.respond(&request).map(text_response),
        }
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.tool_calls.fetch_add(1, Ordering::SeqCst);
        self.record(&request.request);

        let queued = self
            .tool_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(resp) = queued {
            return resp;
        }

        let content = self.respond(&request.request)?;
        Ok(ToolCompletionResponse {
            content: Some(content),
            tool_calls: vec![],
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: MOCK_MODEL.to_string(),
        })
    }
}
