//! Orchestrator - round-robin turn loop
//!
//! # Module Structure
//!
//! - `config`: turn budget and cancellation
//! - `types`: [`RunState`] and its shared [`StateHandle`]
//! - `core`: [`RoundRobinTeam`] and the streaming loop
//! - `run`: the question-level entry points [`run`] and [`run_messages`]

mod config;
mod core;
mod run;
mod types;


pub use config::{OrchestratorConfig, DEFAULT_MAX_TURNS};
pub use self::core::RoundRobinTeam;
pub use run::{run, run_messages, task_prompt, RunOptions};
pub use types::{RunState, StateHandle};
