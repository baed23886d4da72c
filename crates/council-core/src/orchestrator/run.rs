//! Question-level entry points

use super::config::{OrchestratorConfig, DEFAULT_MAX_TURNS};
use super::core::RoundRobinTeam;
use crate::agents::{build_team, default_specs, AgentSettings};
use crate::error::{Error, Result};
use crate::message::TurnMessage;
use council_llm::LlmProvider;
use council_tools::{AccessMode, DataStore, SchemaCache};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Opening message handed to every agent
#[must_use]
pub fn task_prompt(question: &str) -> String {
    format!(
        "Business question from end-user: {}\n\
         Collaborate to deliver insights, charts, and optional code.",
        question
    )
}

/// Options for one question
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Model identifier
    pub model: String,
    /// Turn budget
    pub max_turns: usize,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// How the store is opened for the query tool
    pub access_mode: AccessMode,
    /// Wall-clock limit for one tool call
    pub tool_timeout: Duration,
    /// Cancels the run between or during turns
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model: council_llm::providers::openai::DEFAULT_MODEL.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            temperature: None,
            access_mode: AccessMode::ReadOnly,
            tool_timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    /// Options for `model` with defaults elsewhere
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the turn budget
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the store access mode
    #[must_use]
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set the tool timeout
    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn agent_settings(&self) -> AgentSettings {
        let mut settings = AgentSettings::new(&self.model).with_tool_timeout(self.tool_timeout);
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        settings
    }
}

fn store_error(e: council_tools::Error) -> Error {
    Error::Store(e.to_string())
}

/// Answer `question` over the store at `store_path`, streaming messages.
///
/// Describes the schema through `schema_cache`, opens the store for the
/// query tool and builds the default team. Failing to open the store is
/// returned here, before any agent runs.
#[instrument(skip_all, fields(store = %store_path.as_ref().display(), model = %options.model))]
pub async fn run_messages(
    store_path: impl AsRef<Path>,
    question: &str,
    options: &RunOptions,
    llm: Arc<dyn LlmProvider>,
    schema_cache: &SchemaCache,
) -> Result<BoxStream<'static, Result<TurnMessage>>> {
    let path = store_path.as_ref();
    let schema = schema_cache.describe(path).await.map_err(store_error)?;
    debug!(tables = schema.lines().count(), "Schema ready");

    let store = Arc::new(
        DataStore::open(path, options.access_mode)
            .await
            .map_err(store_error)?,
    );

    let agents = build_team(default_specs(&schema, &store), llm, &options.agent_settings())?;
    let config = OrchestratorConfig::new()
        .with_max_turns(options.max_turns)
        .with_cancel(options.cancel.clone());
    let team = RoundRobinTeam::new(agents, config)?.with_store(store);

    Ok(team.run_stream(task_prompt(question)))
}

/// Like [`run_messages`], rendering each message as `"<source>: <content>"`.
pub async fn run(
    store_path: impl AsRef<Path>,
    question: &str,
    options: &RunOptions,
    llm: Arc<dyn LlmProvider>,
    schema_cache: &SchemaCache,
) -> Result<BoxStream<'static, Result<String>>> {
    let messages = run_messages(store_path, question, options, llm, schema_cache).await?;
    Ok(messages.map(|message| message.map(|m| m.to_line())).boxed())
}
