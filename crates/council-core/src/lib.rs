//! Council Core - Multi-Agent Orchestration Engine
//!
//! This crate answers a business question by running a fixed team of agents
//! in round-robin order over a SQLite store:
//! - Agents: role-bound generators, one optionally bound to `run_sql`
//! - Orchestrator: bounded, pull-driven turn loop yielding each message
//! - Directives: chart / code / table payloads extracted from message text
//! - Session: consumer-side state, snippet execution and dashboard export
//! - Bridge: drive the async run from synchronous callers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod bridge;
pub mod directives;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod session;

pub use agents::{build_team, default_specs, Agent, AgentSettings, AgentSpec, Role};
pub use directives::{extract, Directive, DirectiveKind, Fragment, TablePayload};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use message::{MessageKind, TurnMessage};
pub use orchestrator::{
    run, run_messages, task_prompt, OrchestratorConfig, RoundRobinTeam, RunOptions, RunState,
    StateHandle, DEFAULT_MAX_TURNS,
};
pub use session::{ExecutedArtifact, SessionDispatcher, SessionEvent, SessionState};
