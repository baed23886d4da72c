//! Council Tools - Data Access and Execution Engine
//!
//! This crate provides everything the agents touch outside the model:
//! - Registry / Runner: tool registration and timed execution
//! - Store: a read-mostly SQLite handle scoped to one run
//! - Schema: memoized table/column descriptions (LRU by store identity)
//! - Builtins: the `run_sql` query tool
//! - Sandbox: isolated execution of visualization snippets

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod registry;
pub mod runner;
pub mod sandbox;
pub mod schema;
pub mod store;
pub mod table;

pub use builtins::SqlQueryTool;
pub use error::{Error, Result};
pub use registry::{Tool, ToolDefinition, ToolRegistry, ToolResult};
pub use runner::{ExecutionOptions, ExecutionResult, RunnerConfig, ToolRunner};
pub use sandbox::{
    ResourceLimits, SandboxConfig, SandboxRuntime, SnippetOutcome, SnippetReport, SnippetSandbox,
};
pub use schema::{SchemaCache, DEFAULT_CACHE_CAPACITY, NO_USER_TABLES};
pub use store::{AccessMode, DataStore};
pub use table::{QueryOutput, Table, PREVIEW_ROWS};
