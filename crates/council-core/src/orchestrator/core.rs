//! RoundRobinTeam and the streaming turn loop

use super::config::OrchestratorConfig;
use super::types::{RunState, StateHandle};
use crate::agents::Agent;
use crate::error::{Error, Result};
use crate::message::TurnMessage;
use council_tools::DataStore;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Agents taking turns in declaration order
pub struct RoundRobinTeam {
    agents: Vec<Agent>,
    config: OrchestratorConfig,
    state: StateHandle,
    store: Option<Arc<DataStore>>,
}

impl std::fmt::Debug for RoundRobinTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinTeam")
            .field(
                "agents",
                &self.agents.iter().map(Agent::name).collect::<Vec<_>>(),
            )
            .field("max_turns", &self.config.max_turns)
            .field("state", &self.state.get())
            .finish()
    }
}

impl RoundRobinTeam {
    /// Create a team. Fails when `agents` is empty.
    pub fn new(agents: Vec<Agent>, config: OrchestratorConfig) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::Configuration("team has no agents".to_string()));
        }
        Ok(Self {
            agents,
            config,
            state: StateHandle::default(),
            store: None,
        })
    }

    /// Hand the run's store to the team; it is closed when the run ends.
    #[must_use]
    pub fn with_store(mut self, store: Arc<DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Agents in turn order
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Handle for observing the run state
    #[must_use]
    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Run the team on `task`.
    ///
    /// Nothing happens until the stream is polled. Each turn's messages are
    /// yielded as soon as the turn finishes. A fatal error is yielded once
    /// and ends the stream; other agent errors become error messages and the
    /// run continues. Dropping the stream stops the run, drops the team and
    /// leaves the state `Aborted` with reason `"dropped"`.
    pub fn run_stream(self, task: impl Into<String>) -> BoxStream<'static, Result<TurnMessage>> {
        let RoundRobinTeam {
            agents,
            config,
            state,
            store,
        } = self;
        let task = task.into();
        let run_id = Uuid::new_v4();

        Box::pin(async_stream::stream! {
            let span = info_span!("run", %run_id, agents = agents.len(), max_turns = config.max_turns);
            let _running = state.abort_on_drop();
            let mut store = store;
            let mut conversation: Vec<TurnMessage> = Vec::new();
            info!(parent: &span, "Run started");

            for turn in 0..config.max_turns {
                let agent = &agents[turn % agents.len()];

                if config.cancel.is_cancelled() {
                    info!(parent: &span, turn, "Run cancelled");
                    state.set(RunState::Aborted { turn, reason: "cancelled".to_string() });
                    return;
                }

                state.set(RunState::Running { turn, next_agent: agent.name().to_string() });
                let turn_span = info_span!(parent: &span, "turn", turn, agent = %agent.name());

                let outcome = tokio::select! {
                    biased;
                    _ = config.cancel.cancelled() => None,
                    result = agent.respond(&task, &conversation, turn).instrument(turn_span) => Some(result),
                };

                let Some(result) = outcome else {
                    info!(parent: &span, turn, "Run cancelled mid-turn");
                    state.set(RunState::Aborted { turn, reason: "cancelled".to_string() });
                    return;
                };

                match result {
                    Ok(messages) => {
                        for message in messages {
                            conversation.push(message.clone());
                            yield Ok(message);
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        error!(parent: &span, turn, agent = %agent.name(), error = %e, "Run aborted");
                        state.set(RunState::Aborted { turn, reason: e.to_string() });
                        if let Some(store) = store.take() {
                            store.close().await;
                        }
                        yield Err(e);
                        return;
                    }
                    Err(e) => {
                        warn!(parent: &span, turn, agent = %agent.name(), error = %e, "Turn failed");
                        let message = TurnMessage::error(agent.name(), e.to_string(), turn);
                        conversation.push(message.clone());
                        yield Ok(message);
                    }
                }
            }

            state.set(RunState::Completed { turns: config.max_turns });
            if let Some(store) = store.take() {
                store.close().await;
            }
            info!(parent: &span, messages = conversation.len(), "Run completed");
        })
    }
}
