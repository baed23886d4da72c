//! OpenAI - async-openai provider
//!
//! Works against api.openai.com or any endpoint speaking the same chat
//! completions protocol (set `OPENAI_BASE_URL`).

use crate::completion::{
    CompletionRequest, CompletionResponse, TokenUsage, ToolCompletionRequest,
    ToolCompletionResponse,
};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::router::LlmProvider;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use crate::util::{mask_api_key, truncate_safe, validate_api_key};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatChoice, ChatCompletionMessageToolCalls, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionTools,
        CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionResponse,
        FunctionObject, ToolChoiceOptions,
    },
    Client,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_ERROR_CHARS: usize = 300;

fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if ["api key", "apikey", "invalid key", "unauthorized", "authentication"]
        .iter()
        .any(|p| lower.contains(p))
    {
        return "API authentication error. Check OPENAI_API_KEY.".to_string();
    }
    if lower.contains("rate limit") || lower.contains("quota") {
        return "API rate limit exceeded. Try again later.".to_string();
    }
    if error.len() > MAX_ERROR_CHARS {
        return format!("{}...(truncated)", truncate_safe(error, MAX_ERROR_CHARS));
    }
    error.to_string()
}

/// Connection settings for [`OpenAiProvider`]
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: String,
    /// Alternative endpoint (proxies, local servers)
    pub base_url: Option<String>,
    /// Organization id
    pub org_id: Option<String>,
    /// Model used when a request leaves `model` empty
    pub default_model: String,
    /// Per-request timeout, also the retry budget
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("org_id", &self.org_id.as_ref().map(|_| "[REDACTED]"))
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    /// Settings for `api_key` with defaults elsewhere
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            org_id: None,
            default_model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_ORG_ID`.
    ///
    /// # Errors
    /// `Error::NotConfigured` if the key is missing or obviously invalid
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
        if let Some(problem) = validate_api_key(&api_key, "OpenAI") {
            return Err(Error::NotConfigured(problem));
        }

        let mut config = Self::new(api_key);
        config.base_url = std::env::var("OPENAI_BASE_URL").ok();
        config.org_id = std::env::var("OPENAI_ORG_ID").ok();
        Ok(config)
    }

    /// Use another endpoint
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the organization id
    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Set the fallback model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat completions over the OpenAI protocol
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    default_model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Build a client from `config`
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        if let Some(org_id) = &config.org_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        // Without a client timeout an unreachable backend stalls the whole run.
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(config.timeout),
            ..Default::default()
        };

        Self {
            client: Client::build(http_client, openai_config, backoff),
            default_model: config.default_model,
            timeout: config.timeout,
        }
    }

    fn chat_request(&self, request: CompletionRequest) -> CreateChatCompletionRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };
        CreateChatCompletionRequest {
            model,
            messages: request.messages.into_iter().map(convert_message).collect(),
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            ..Default::default()
        }
    }

    async fn send(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<(ChatChoice, Option<TokenUsage>, String)> {
        let response: CreateChatCompletionResponse = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.map_error(e))?;

        let usage = response.usage.map(convert_usage);
        if let Some(usage) = &usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;
        Ok((choice, usage, response.model))
    }

    fn map_error(&self, error: OpenAIError) -> Error {
        match error {
            OpenAIError::Reqwest(e) if e.is_timeout() => {
                Error::Timeout(self.timeout.as_millis() as u64)
            }
            OpenAIError::Reqwest(e) => {
                warn!(error = %e, "OpenAI transport failure");
                Error::Network(sanitize_api_error(&e.to_string()))
            }
            other => {
                let message = other.to_string();
                if message.to_lowercase().contains("rate limit") {
                    Error::RateLimit
                } else {
                    Error::Api(sanitize_api_error(&message))
                }
            }
        }
    }
}

fn convert_message(msg: Message) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(msg.content),
            name: None,
        }
        .into(),
        MessageRole::User => ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content),
            name: msg.name,
        }
        .into(),
        MessageRole::Assistant =>
        {
            #[allow(deprecated)]
            ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content,
                )),
                name: msg.name,
                tool_calls: None,
                function_call: None,
                refusal: None,
                audio: None,
            }
            .into()
        }
    }
}

fn convert_tool(tool: ToolDefinition) -> ChatCompletionTools {
    ChatCompletionTools::Function(ChatCompletionTool {
        function: FunctionObject {
            name: tool.name,
            description: Some(tool.description),
            parameters: Some(tool.parameters),
            strict: None,
        },
    })
}

fn convert_tool_choice(choice: ToolChoice) -> ChatCompletionToolChoiceOption {
    ChatCompletionToolChoiceOption::Mode(match choice {
        ToolChoice::Auto => ToolChoiceOptions::Auto,
        ToolChoice::None => ToolChoiceOptions::None,
        ToolChoice::Required => ToolChoiceOptions::Required,
    })
}

fn convert_usage(usage: CompletionUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let (choice, usage, model) = self.send(self.chat_request(request)).await?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice.finish_reason.map(|r| format!("{:?}", r)),
            model,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.request.model, tools = request.tools.len()))]
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let mut chat = self.chat_request(request.request);
        chat.tools = Some(request.tools.into_iter().map(convert_tool).collect());
        chat.tool_choice = Some(convert_tool_choice(request.tool_choice));

        let (choice, usage, model) = self.send(chat).await?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| match call {
                ChatCompletionMessageToolCalls::Function(call) => Some(ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                }),
                _ => None,
            })
            .collect();

        Ok(ToolCompletionResponse {
            content: choice.message.content,
            tool_calls,
            usage,
            finish_reason: choice.finish_reason.map(|r| format!("{:?}", r)),
            model,
        })
    }
}
