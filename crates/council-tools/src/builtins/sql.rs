//! `run_sql` - execute one statement against the run's store
//!
//! Statement shape is not inspected here. Whether writes can succeed depends
//! only on the [`AccessMode`](crate::store::AccessMode) the store was opened
//! with.

use crate::error::{Error, Result};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use crate::store::DataStore;
use crate::table::QueryOutput;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Tool name exposed to the model
pub const RUN_SQL: &str = "run_sql";

#[derive(Debug, Deserialize)]
struct RunSqlInput {
    sql: String,
}

/// Query tool bound to a single store
pub struct SqlQueryTool {
    definition: ToolDefinition,
    store: Arc<DataStore>,
}

impl SqlQueryTool {
    /// Bind the tool to `store`
    #[must_use]
    pub fn new(store: Arc<DataStore>) -> Self {
        let definition = ToolDefinition::new(
            RUN_SQL,
            "Run a SELECT and return JSON {preview_markdown, data_json}.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "One SQL SELECT statement"
                }
            },
            "required": ["sql"]
        }));

        Self { definition, store }
    }
}

#[async_trait::async_trait]
impl Tool for SqlQueryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let input: RunSqlInput =
            serde_json::from_value(input).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let sql = input.sql.trim();
        if sql.is_empty() {
            return Err(Error::InvalidInput("sql must not be empty".to_string()));
        }

        info!(store = %self.store.path().display(), sql = %sql, "Running query");
        let table = self.store.fetch_table(sql).await?;
        debug!(rows = table.len(), "Query returned");

        let output = serde_json::to_value(QueryOutput::from_table(table))
            .map_err(|e| Error::Execution(format!("Failed to serialize result: {}", e)))?;

        Ok(ToolResult::success(
            output,
            start.elapsed().as_millis() as u64,
        ))
    }

    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        match input.get("sql") {
            Some(serde_json::Value::String(_)) => Ok(()),
            _ => Err(Error::InvalidInput(
                "expected an object with a string field `sql`".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use crate::runner::ToolRunner;
    use crate::store::AccessMode;
    use crate::table::{Table, PREVIEW_ROWS};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    async fn sales_store(dir: &tempfile::TempDir, rows: usize) -> Arc<DataStore> {
        let path = dir.path().join("sales.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE sales (id INTEGER, amount REAL, region TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        for i in 0..rows {
            sqlx::query("INSERT INTO sales VALUES (?, ?, ?)")
                .bind(i as i64)
                .bind(10.0 * i as f64)
                .bind(if i % 2 == 0 { "West" } else { "East" })
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;
        Arc::new(DataStore::open(&path, AccessMode::ReadOnly).await.unwrap())
    }

    fn output_of(result: &ToolResult) -> QueryOutput {
        serde_json::from_value(result.output.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_small_result_preview_equals_data() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SqlQueryTool::new(sales_store(&dir, 3).await);

        let result = tool
            .execute(serde_json::json!({"sql": "SELECT * FROM sales ORDER BY id"}))
            .await
            .unwrap();
        assert!(result.success);

        let output = output_of(&result);
        assert_eq!(output.data_json.len(), 3);
        assert_eq!(output.preview_markdown, output.data_json.to_markdown());
    }

    #[tokio::test]
    async fn test_large_result_preview_capped() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SqlQueryTool::new(sales_store(&dir, 50).await);

        let result = tool
            .execute(serde_json::json!({"sql": "SELECT id FROM sales ORDER BY id"}))
            .await
            .unwrap();
        let output = output_of(&result);

        assert_eq!(output.data_json.len(), 50);
        let expected: Table = output.data_json.head(PREVIEW_ROWS);
        assert_eq!(output.preview_markdown, expected.to_markdown());
    }

    #[tokio::test]
    async fn test_text_form_is_table_message() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SqlQueryTool::new(sales_store(&dir, 2).await);

        let result = tool
            .execute(serde_json::json!({"sql": "SELECT region FROM sales"}))
            .await
            .unwrap();
        let text = result.to_text();
        assert!(text.starts_with('{'));
        assert!(text.contains("\"data_json\""));
        assert!(text.contains("\"preview_markdown\""));
    }

    #[tokio::test]
    async fn test_bad_sql_surfaces_as_failure_through_runner() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SqlQueryTool::new(sales_store(&dir, 1).await)));
        let runner = ToolRunner::with_defaults(Arc::new(registry));

        let exec = runner
            .execute(RUN_SQL, serde_json::json!({"sql": "SELECT * FROM nowhere"}))
            .await
            .unwrap();
        assert!(!exec.result.success);
        assert!(exec.result.error.unwrap().contains("no such table"));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SqlQueryTool::new(sales_store(&dir, 1).await);

        assert!(tool.validate_input(&serde_json::json!({"sql": "SELECT 1"})).is_ok());
        assert!(tool.validate_input(&serde_json::json!({"query": "SELECT 1"})).is_err());
        assert!(matches!(
            tool.execute(serde_json::json!({"sql": "   "})).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
