use super::*;
use serde_json::json;

fn table_message(rows: &[(&str, f64)]) -> TurnMessage {
    let table = Table::new(
        vec!["region".to_string(), "total".to_string()],
        rows.iter()
            .map(|(region, total)| vec![json!(region), json!(total)])
            .collect(),
    );
    let content = serde_json::to_string_pretty(&council_tools::QueryOutput::from_table(table)).unwrap();
    TurnMessage::tool_result("QueryAgent", content, 1)
}

// ── Routing ──

#[tokio::test]
async fn test_insights_are_attributed() {
    let mut session = SessionDispatcher::new("q", None);

    let events = session
        .ingest(&TurnMessage::text("AnalysisAgent", "- East leads\n\n- West trails", 2))
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        session.state().insights,
        vec!["**AnalysisAgent**: - East leads", "**AnalysisAgent**: - West trails"]
    );
}

#[tokio::test]
async fn test_charts_in_order_and_malformed_reported() {
    let mut session = SessionDispatcher::new("q", None);
    let content = "CHART_JSON: {\"mark\": \"bar\"}\nCHART_JSON: {oops}\nCHART_JSON: {\"mark\": \"line\"}";

    let events = session.ingest(&TurnMessage::text("VizAgent", content, 3)).await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[1], SessionEvent::ChartError { .. }));
    assert_eq!(
        session.state().charts,
        vec![json!({"mark": "bar"}), json!({"mark": "line"})]
    );
    assert_eq!(session.state().errors.len(), 1);
}

#[tokio::test]
async fn test_table_replaces_latest_frame() {
    let mut session = SessionDispatcher::new("q", None);

    let events = session.ingest(&table_message(&[("East", 1.0), ("West", 2.0)])).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        SessionEvent::Frame {
            preview_markdown,
            rows,
        } => {
            assert_eq!(*rows, 2);
            assert!(preview_markdown.contains("| East"));
        }
        other => panic!("expected frame, got {:?}", other),
    }

    session.ingest(&table_message(&[("North", 3.0)])).await;
    assert_eq!(session.latest_frame().map(Table::len), Some(1));
    assert_eq!(session.state().frames.len(), 2);
    assert!(session.state().insights.is_empty());
}

#[tokio::test]
async fn test_snippet_skipped_without_sandbox() {
    let mut session = SessionDispatcher::new("q", None);
    let content = "CODE_PY:\n```python\nchart = {}\n```";

    let events = session.ingest(&TurnMessage::text("CodeAgent", content, 4)).await;

    assert_eq!(events, vec![SessionEvent::SnippetSkipped]);
    assert!(session.state().executed.is_empty());
}

#[tokio::test]
async fn test_malformed_code_is_execution_failure() {
    let mut session = SessionDispatcher::new("q", None);

    let events = session
        .ingest(&TurnMessage::text("CodeAgent", "CODE_PY: plt.plot()", 4))
        .await;

    assert!(matches!(events[0], SessionEvent::ExecutionFailed { .. }));
}

// ── Errors ──

#[tokio::test]
async fn test_error_messages_and_tool_failures() {
    let mut session = SessionDispatcher::new("q", None);

    let events = session
        .ingest(&TurnMessage::error("VizAgent", "llm error: bad request", 3))
        .await;
    assert_eq!(
        events,
        vec![SessionEvent::AgentError {
            source: "VizAgent".to_string(),
            message: "llm error: bad request".to_string()
        }]
    );

    let events = session
        .ingest(&TurnMessage::tool_result(
            "QueryAgent",
            r#"{"error": "no such table: nowhere"}"#,
            1,
        ))
        .await;
    assert_eq!(
        events,
        vec![SessionEvent::ToolFailed {
            source: "QueryAgent".to_string(),
            error: "no such table: nowhere".to_string()
        }]
    );

    let event = session.record_run_error(&Error::Store("gone".to_string()));
    assert!(matches!(event, SessionEvent::RunError { .. }));
    assert_eq!(session.state().errors.len(), 3);
}

// ── Export ──

#[tokio::test]
async fn test_dashboard_payload() {
    let mut session = SessionDispatcher::new("top region?", None);
    session.ingest(&table_message(&[("East", 1.5)])).await;
    session
        .ingest(&TurnMessage::text("VizAgent", "CHART_JSON: {\"mark\": \"bar\"}\nLooks good", 3))
        .await;

    let payload = session.into_state().to_dashboard_payload().unwrap();

    assert_eq!(payload["question"], "top region?");
    assert_eq!(payload["charts"], json!([{"mark": "bar"}]));
    assert_eq!(payload["insights"], json!(["**VizAgent**: Looks good"]));
    assert_eq!(
        payload["frames"][0],
        json!({"columns": ["region", "total"], "index": [0], "data": [["East", 1.5]]})
    );
    assert!(payload["created_at"].is_string());
}

// ── Sandbox ──

#[tokio::test]
async fn test_snippet_sees_latest_frame() {
    let sandbox = SnippetSandbox::default();
    if !sandbox.is_available().await {
        eprintln!("python3 not available, skipping");
        return;
    }
    let mut session = SessionDispatcher::new("q", Some(sandbox));
    session
        .ingest(&table_message(&[("East", 1.0), ("West", 2.0), ("North", 3.0)]))
        .await;

    let content = "CODE_PY:\n```python\nchart = {\"rows\": len(df_latest)}\n```";
    let events = session.ingest(&TurnMessage::text("CodeAgent", content, 4)).await;

    assert_eq!(
        events,
        vec![SessionEvent::Executed {
            artifact: ExecutedArtifact::Chart {
                spec: json!({"rows": 3})
            }
        }]
    );
    assert_eq!(session.state().executed.len(), 1);
}

#[tokio::test]
async fn test_failing_snippet_does_not_stop_message() {
    let sandbox = SnippetSandbox::default();
    if !sandbox.is_available().await {
        eprintln!("python3 not available, skipping");
        return;
    }
    let mut session = SessionDispatcher::new("q", Some(sandbox));
    let content = "CODE_PY:\n```python\nraise ValueError('nope')\n```\nStill here";

    let events = session.ingest(&TurnMessage::text("CodeAgent", content, 4)).await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        SessionEvent::ExecutionFailed { error } => assert!(error.contains("ValueError")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(matches!(events[1], SessionEvent::Insight { .. }));
}
