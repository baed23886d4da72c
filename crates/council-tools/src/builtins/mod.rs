//! Built-in tools

mod sql;

pub use sql::{SqlQueryTool, RUN_SQL};
