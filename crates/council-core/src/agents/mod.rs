//! Agents - role-bound text generators
//!
//! Each agent owns a fixed system directive and at most one tool. An agent
//! turn renders the shared conversation into a chat request, calls the
//! provider and returns the messages that make up its turn output.
//!
//! # Module Structure
//!
//! - `roles`: the five built-in roles and their directives
//! - [`build_team`]: assemble the default team over one store

mod roles;


pub use roles::{build_team, default_specs, Role};

use crate::error::{Error, Result};
use crate::message::TurnMessage;
use council_llm::{CompletionRequest, LlmProvider, Message, ToolChoice, ToolCompletionRequest};
use council_tools::{ExecutionOptions, RunnerConfig, Tool, ToolRegistry, ToolResult, ToolRunner};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Static description of one agent
#[derive(Clone)]
pub struct AgentSpec {
    /// Unique name within a team, used as message source
    pub name: String,
    /// System directive sent with every request
    pub system_message: String,
    /// Optional bound tool
    pub tool: Option<Arc<dyn Tool>>,
    /// Ask the model to summarise after a tool call
    pub reflect_on_tool_use: bool,
}

impl AgentSpec {
    /// Create an untooled agent spec
    #[must_use]
    pub fn new(name: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_message: system_message.into(),
            tool: None,
            reflect_on_tool_use: false,
        }
    }

    /// Bind a tool
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Enable or disable reflection after tool use
    #[must_use]
    pub fn with_reflection(mut self, reflect: bool) -> Self {
        self.reflect_on_tool_use = reflect;
        self
    }
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field(
                "tool",
                &self.tool.as_ref().map(|t| t.definition().name.clone()),
            )
            .field("reflect_on_tool_use", &self.reflect_on_tool_use)
            .finish()
    }
}

/// Generation settings shared by every agent of a run
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model identifier passed to the provider
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion token cap
    pub max_tokens: Option<u32>,
    /// Wall-clock limit for one tool call
    pub tool_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: council_llm::providers::openai::DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            tool_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentSettings {
    /// Settings for `model` with defaults elsewhere
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the tool timeout
    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }
}

/// A live agent bound to a provider
pub struct Agent {
    spec: AgentSpec,
    llm: Arc<dyn LlmProvider>,
    settings: AgentSettings,
    runner: Option<ToolRunner>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("spec", &self.spec)
            .field("provider", &self.llm.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Agent {
    /// Bind `spec` to a provider
    #[must_use]
    pub fn new(spec: AgentSpec, llm: Arc<dyn LlmProvider>, settings: AgentSettings) -> Self {
        let runner = spec.tool.as_ref().map(|tool| {
            let mut registry = ToolRegistry::new();
            registry.register(Arc::clone(tool));
            ToolRunner::new(
                Arc::new(registry),
                RunnerConfig::new(settings.tool_timeout),
            )
        });

        Self {
            spec,
            llm,
            settings,
            runner,
        }
    }

    /// Agent name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Static spec
    #[must_use]
    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    /// Produce this agent's output for `turn`.
    ///
    /// Untooled agents return a single text message. A tool-bound agent
    /// returns the tool echo followed, when reflecting, by a summary.
    #[instrument(skip(self, task, conversation), fields(agent = %self.spec.name, history = conversation.len()))]
    pub async fn respond(
        &self,
        task: &str,
        conversation: &[TurnMessage],
        turn: usize,
    ) -> Result<Vec<TurnMessage>> {
        let messages = self.build_messages(task, conversation);

        let Some(runner) = &self.runner else {
            let response = self.llm.complete(self.request(messages)).await?;
            return Ok(vec![TurnMessage::text(
                &self.spec.name,
                response.content,
                turn,
            )]);
        };

        let tools = runner.registry().to_llm_tools();
        let request = ToolCompletionRequest::new(self.request(messages.clone()), tools)
            .with_tool_choice(ToolChoice::Auto);
        let response = self.llm.complete_with_tools(request).await?;

        let mut calls = response.tool_calls.into_iter();
        let Some(call) = calls.next() else {
            let content = response.content.unwrap_or_default();
            return Ok(vec![TurnMessage::text(&self.spec.name, content, turn)]);
        };

        let ignored = calls.count();
        if ignored > 0 {
            warn!(agent = %self.spec.name, ignored, "Only the first tool call per turn is executed");
        }

        let input: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
            warn!(agent = %self.spec.name, error = %e, "Unparseable tool arguments");
            serde_json::json!({})
        });

        let result = match runner
            .execute_with_options(
                &call.name,
                input,
                ExecutionOptions::with_timeout(self.settings.tool_timeout),
            )
            .await
        {
            Ok(exec) => exec.result,
            Err(e) => ToolResult::failure(e.to_string(), 0),
        };
        debug!(tool = %call.name, success = result.success, "Tool call finished");

        let echo = result.to_text();
        let mut output = vec![TurnMessage::tool_result(&self.spec.name, echo.clone(), turn)];

        if self.spec.reflect_on_tool_use {
            let mut reflection = messages;
            reflection.push(Message::assistant(format!(
                "Calling {}({})",
                call.name, call.arguments
            )));
            reflection.push(Message::user(format!(
                "{} returned:\n{}\n\nSummarise the result for the team.",
                call.name, echo
            )));

            match self.llm.complete(self.request(reflection)).await {
                Ok(summary) => {
                    output.push(TurnMessage::text(&self.spec.name, summary.content, turn));
                }
                Err(e) => {
                    let err = Error::from(e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(agent = %self.spec.name, error = %err, "Reflection failed");
                    output.push(TurnMessage::error(&self.spec.name, err.to_string(), turn));
                }
            }
        }

        Ok(output)
    }

    fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        let mut request = CompletionRequest::new(&self.settings.model).with_messages(messages);
        if let Some(temperature) = self.settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    fn build_messages(&self, task: &str, conversation: &[TurnMessage]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 2);
        messages.push(Message::system(&self.spec.system_message));
        messages.push(Message::user(task));

        for msg in conversation {
            if msg.source == self.spec.name {
                messages.push(Message::assistant(&msg.content));
            } else {
                messages.push(Message::user(msg.to_line()).with_name(&msg.source));
            }
        }

        messages
    }
}
