//! Integration tests for Council
//!
//! These tests drive a whole question through the public surface:
//! - council-tools: store, schema cache and query tool
//! - council-llm: scripted provider
//! - council-core: team, directives and session dispatcher

use std::path::PathBuf;
use std::sync::Arc;

use council_core::{
    bridge, run, run_messages, Error, MessageKind, RunOptions, SessionDispatcher, SessionEvent,
};
use council_llm::MockProvider;
use council_tools::SchemaCache;
use futures::StreamExt;
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

async fn orders_db(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("orders.db");
    let pool = SqlitePoolOptions::new()
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
    sqlx::query("CREATE TABLE orders (id INTEGER PRIMARY KEY, region TEXT, total REAL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO orders (region, total) VALUES ('East', 120.0), ('West', 80.0), ('East', 30.0)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
    path
}

fn scripted_team() -> Arc<MockProvider> {
    let llm = Arc::new(MockProvider::new().with_responder(|request| {
        let system = request.system_prompt().unwrap_or_default();
        Ok(if system.contains("business analyst") {
            "- East leads with 150.0 in total.".to_string()
        } else if system.contains("Vega-Lite") {
            "CHART_JSON: {\"mark\": \"bar\", \"encoding\": {\"x\": {\"field\": \"region\"}}}"
                .to_string()
        } else if system.contains("CODE_PY") {
            "CODE_PY:\n```python\nchart = {\"rows\": len(df_latest)}\n```".to_string()
        } else {
            "Plan: aggregate orders by region.".to_string()
        })
    }));
    llm.add_tool_call(
        "run_sql",
        json!({"sql": "SELECT region, SUM(total) AS total FROM orders GROUP BY region ORDER BY total DESC"}),
    );
    llm
}

// ============================================================================
// Full question flow
// ============================================================================

#[tokio::test]
async fn test_question_to_dashboard_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = orders_db(&dir).await;
    let llm = scripted_team();
    let cache = SchemaCache::default();

    let mut stream = run_messages(
        &path,
        "Which region sells the most?",
        &RunOptions::new("mock-model").with_max_turns(5),
        llm.clone(),
        &cache,
    )
    .await
    .unwrap();

    let mut session = SessionDispatcher::new("Which region sells the most?", None);
    let mut events = Vec::new();
    let mut sources = Vec::new();
    while let Some(message) = stream.next().await {
        let message = message.unwrap();
        sources.push(message.source.clone());
        events.extend(session.ingest(&message).await);
    }

    // The query turn yields the tool echo and its summary
    assert_eq!(
        sources,
        vec!["SchemaAgent", "QueryAgent", "QueryAgent", "AnalysisAgent", "VizAgent", "CodeAgent"]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Frame { rows: 2, .. })));
    assert!(events.contains(&SessionEvent::SnippetSkipped));

    let payload = session.into_state().to_dashboard_payload().unwrap();
    assert_eq!(payload["question"], "Which region sells the most?");
    assert_eq!(payload["frames"][0]["columns"], json!(["region", "total"]));
    assert_eq!(payload["frames"][0]["data"][0], json!(["East", 150.0]));
    assert_eq!(payload["charts"][0]["mark"], "bar");
    assert!(payload["insights"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i == "**AnalysisAgent**: - East leads with 150.0 in total."));
    assert_eq!(payload["errors"], json!([]));
}

#[tokio::test]
async fn test_schema_is_introspected_once_per_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = orders_db(&dir).await;
    let cache = SchemaCache::default();

    for _ in 0..2 {
        let llm = Arc::new(MockProvider::new());
        let messages: Vec<_> = run_messages(
            &path,
            "q",
            &RunOptions::new("mock-model").with_max_turns(1),
            llm,
            &cache,
        )
        .await
        .unwrap()
        .collect()
        .await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_ref().unwrap().kind, MessageKind::Text);
    }

    assert_eq!(cache.introspection_count(), 1);
}

#[tokio::test]
async fn test_unreachable_model_ends_run_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = orders_db(&dir).await;
    let llm = Arc::new(MockProvider::new());
    llm.add_error(council_llm::Error::Network("connection refused".to_string()));

    let mut stream = run_messages(&path, "q", &RunOptions::default(), llm, &SchemaCache::default())
        .await
        .unwrap();
    let mut session = SessionDispatcher::new("q", None);

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.is_fatal());
    let event = session.record_run_error(&err);
    assert!(matches!(event, SessionEvent::RunError { .. }));
    assert!(stream.next().await.is_none());
}

// ============================================================================
// Synchronous callers
// ============================================================================

#[test]
fn test_lines_from_sync_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = bridge::block_on({
        let path = dir.path().join("orders.db");
        async move {
            let pool = SqlitePoolOptions::new()
                .connect_with(
                    SqliteConnectOptions::new()
                        .filename(&path)
                        .create_if_missing(true),
                )
                .await
                .unwrap();
            sqlx::query("CREATE TABLE orders (id INTEGER, total REAL)")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
            path
        }
    })
    .unwrap();

    let lines = bridge::block_on(async move {
        let llm = Arc::new(MockProvider::new());
        run(
            &path,
            "q",
            &RunOptions::default().with_max_turns(2),
            llm,
            &SchemaCache::default(),
        )
        .await
    })
    .unwrap()
    .unwrap();

    let collected = bridge::collect_lines_blocking(lines).unwrap();
    assert_eq!(
        collected,
        vec!["SchemaAgent: mock response", "QueryAgent: mock response"]
    );
}

#[test]
fn test_missing_store_from_sync_code() {
    let err = bridge::block_on(async {
        run(
            "/nonexistent/council/orders.db",
            "q",
            &RunOptions::default(),
            Arc::new(MockProvider::new()),
            &SchemaCache::default(),
        )
        .await
        .map(|_| ())
    })
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_embedded_config_parses() {
    let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
        .unwrap();
    let config = config::Config::builder()
        .add_source(config::File::from_str(&text, config::FileFormat::Toml))
        .build()
        .unwrap();

    assert_eq!(config.get_int("orchestrator.max_turns").unwrap(), 10);
    assert_eq!(
        config.get_string("orchestrator.access_mode").unwrap(),
        "read_only"
    );
    assert!(config.get_bool("sandbox.enabled").unwrap());
}
