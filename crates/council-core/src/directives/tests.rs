use super::lexer::{lex, BraceScanner, Token};
use super::*;
use serde_json::json;

fn insight(source: &str, text: &str) -> Fragment {
    Fragment::Insight {
        source: source.to_string(),
        text: text.to_string(),
    }
}

// ── Lexer ──

#[test]
fn test_lex_tokens() {
    let lines = lex("  CHART_JSON: {}\n\nCODE_PY:\n```python\nx = 1\n```");
    let tokens: Vec<Token> = lines.iter().map(|l| l.token).collect();
    assert_eq!(
        tokens,
        vec![
            Token::Chart("{}"),
            Token::Blank,
            Token::Code(""),
            Token::Fence("python"),
            Token::Text,
            Token::Fence(""),
        ]
    );
}

#[test]
fn test_brace_scanner_ignores_string_braces() {
    let mut scanner = BraceScanner::default();
    assert_eq!(scanner.feed(r#"{"title": "a } b", "#), None);
    assert_eq!(scanner.feed(r#""esc": "\"}"}tail"#), Some(13));
}

// ── Charts ──

#[test]
fn test_chart_then_prose_lines() {
    let content = "CHART_JSON: {\"mark\": \"bar\"}\nEast leads.\nWest trails.";
    let fragments = extract("VizAgent", content);

    assert_eq!(
        fragments,
        vec![
            Fragment::Directive(Directive::ChartSpec(json!({"mark": "bar"}))),
            insight("VizAgent", "East leads."),
            insight("VizAgent", "West trails."),
        ]
    );
}

#[test]
fn test_multiple_charts_in_order() {
    let content = "Two views:\nCHART_JSON: {\"n\": 1}\nCHART_JSON: {\"n\": 2}";
    let charts: Vec<Value> = directives(content)
        .into_iter()
        .filter_map(|d| match d {
            Directive::ChartSpec(spec) => Some(spec),
            _ => None,
        })
        .collect();
    assert_eq!(charts, vec![json!({"n": 1}), json!({"n": 2})]);
}

#[test]
fn test_fenced_chart_on_following_lines() {
    let content = "CHART_JSON:\n```json\n{\n  \"mark\": \"line\"\n}\n```\ndone";
    let fragments = extract("VizAgent", content);
    assert_eq!(
        fragments,
        vec![
            Fragment::Directive(Directive::ChartSpec(json!({"mark": "line"}))),
            insight("VizAgent", "done"),
        ]
    );
}

#[test]
fn test_fence_opened_on_marker_line() {
    let content = "CHART_JSON: ```json\n{\"mark\": \"point\"}\n```";
    assert_eq!(
        directives(content),
        vec![Directive::ChartSpec(json!({"mark": "point"}))]
    );

    let inline = "CHART_JSON: ```json {\"mark\": \"area\"} ```";
    assert_eq!(
        directives(inline),
        vec![Directive::ChartSpec(json!({"mark": "area"}))]
    );
}

#[test]
fn test_unfenced_multiline_chart_with_trailing_text() {
    let content = "CHART_JSON: {\"data\": {\"values\": [\n  {\"r\": \"E\", \"t\": \"}\"}\n]}} shows totals\nnext";
    let fragments = extract("VizAgent", content);
    assert_eq!(fragments.len(), 3);
    assert_eq!(
        fragments[0],
        Fragment::Directive(Directive::ChartSpec(
            json!({"data": {"values": [{"r": "E", "t": "}"}]}})
        ))
    );
    assert_eq!(fragments[1], insight("VizAgent", "shows totals"));
    assert_eq!(fragments[2], insight("VizAgent", "next"));
}

#[test]
fn test_malformed_chart_does_not_stop_parsing() {
    let content = "CHART_JSON: {\"mark\": bar}\nCHART_JSON: {\"mark\": \"bar\"}\nafter";
    let fragments = extract("VizAgent", content);

    assert_eq!(fragments.len(), 3);
    match &fragments[0] {
        Fragment::Malformed { kind, raw, .. } => {
            assert_eq!(*kind, DirectiveKind::Chart);
            assert_eq!(raw, "CHART_JSON: {\"mark\": bar}");
        }
        other => panic!("expected malformed chart, got {:?}", other),
    }
    assert_eq!(
        fragments[1],
        Fragment::Directive(Directive::ChartSpec(json!({"mark": "bar"})))
    );
    assert_eq!(fragments[2], insight("VizAgent", "after"));
}

#[test]
fn test_chart_marker_without_payload() {
    let fragments = extract("VizAgent", "CHART_JSON: see below\nplain");
    assert!(matches!(
        fragments[0],
        Fragment::Malformed {
            kind: DirectiveKind::Chart,
            ..
        }
    ));
    assert_eq!(fragments[1], insight("VizAgent", "plain"));
}

#[test]
fn test_unbalanced_chart_is_malformed() {
    let fragments = extract("VizAgent", "CHART_JSON: {\"mark\": {\"type\": \"bar\"}");
    assert_eq!(fragments.len(), 1);
    assert!(matches!(
        fragments[0],
        Fragment::Malformed {
            kind: DirectiveKind::Chart,
            ..
        }
    ));
}

// ── Code ──

#[test]
fn test_code_snippet_dedented() {
    let content = "Here is a plot.\nCODE_PY:\n```python\n    fig, ax = plt.subplots()\n    if True:\n        ax.plot([1, 2])\n```\nEnjoy.";
    let fragments = extract("CodeAgent", content);
    assert_eq!(
        fragments,
        vec![
            insight("CodeAgent", "Here is a plot."),
            Fragment::Directive(Directive::CodeSnippet(
                "fig, ax = plt.subplots()\nif True:\n    ax.plot([1, 2])".to_string()
            )),
            insight("CodeAgent", "Enjoy."),
        ]
    );
}

#[test]
fn test_code_fence_on_marker_line_and_py_alias() {
    let content = "CODE_PY: ```py\nchart = alt.Chart(df_latest).mark_bar()\n```";
    assert_eq!(
        directives(content),
        vec![Directive::CodeSnippet(
            "chart = alt.Chart(df_latest).mark_bar()".to_string()
        )]
    );
}

#[test]
fn test_code_fence_opened_and_closed_on_marker_line() {
    let content = "CODE_PY: ```python chart = {'mark': 'bar'}```\nDone.";
    assert_eq!(
        extract("CodeAgent", content),
        vec![
            Fragment::Directive(Directive::CodeSnippet(
                "chart = {'mark': 'bar'}".to_string()
            )),
            insight("CodeAgent", "Done."),
        ]
    );
}

#[test]
fn test_code_starting_on_marker_line_continues_to_fence() {
    let content = "CODE_PY: ```python fig, ax = plt.subplots()\nax.plot(df_latest['total'])\n```";
    assert_eq!(
        directives(content),
        vec![Directive::CodeSnippet(
            "fig, ax = plt.subplots()\nax.plot(df_latest['total'])".to_string()
        )]
    );
}

#[test]
fn test_inline_fence_with_other_language_is_malformed() {
    let fragments = extract("CodeAgent", "CODE_PY: ```bash echo hi```");
    assert!(matches!(
        fragments[0],
        Fragment::Malformed {
            kind: DirectiveKind::Code,
            ..
        }
    ));
}

#[test]
fn test_code_blank_lines_before_fence() {
    let content = "CODE_PY:\n\n```\nx = 1\n```";
    assert_eq!(
        directives(content),
        vec![Directive::CodeSnippet("x = 1".to_string())]
    );
}

#[test]
fn test_code_without_fence_is_malformed() {
    let fragments = extract("CodeAgent", "CODE_PY: print(1)\nnote");
    assert!(matches!(
        fragments[0],
        Fragment::Malformed {
            kind: DirectiveKind::Code,
            ..
        }
    ));
    assert_eq!(fragments[1], insight("CodeAgent", "note"));
}

#[test]
fn test_unterminated_code_fence() {
    let fragments = extract("CodeAgent", "CODE_PY:\n```python\nfig = 1\n");
    assert_eq!(fragments.len(), 1);
    match &fragments[0] {
        Fragment::Malformed { kind, error, raw } => {
            assert_eq!(*kind, DirectiveKind::Code);
            assert!(error.contains("unterminated"));
            assert!(raw.contains("fig = 1"));
        }
        other => panic!("expected malformed code, got {:?}", other),
    }
}

#[test]
fn test_stray_fence_is_prose() {
    let fragments = extract("AnalysisAgent", "```\n- point\n```");
    assert_eq!(
        fragments,
        vec![
            insight("AnalysisAgent", "```"),
            insight("AnalysisAgent", "- point"),
            insight("AnalysisAgent", "```"),
        ]
    );
}

// ── Tables ──

#[test]
fn test_table_message_with_object_data() {
    let content = json!({
        "preview_markdown": "| region |\n|:-------|\n| East   |",
        "data_json": {"columns": ["region"], "index": [0], "data": [["East"]]}
    })
    .to_string();

    let fragments = extract("QueryAgent", &content);
    assert_eq!(fragments.len(), 1);
    match &fragments[0] {
        Fragment::Directive(Directive::TablePayload(payload)) => {
            assert_eq!(payload.data.columns, vec!["region"]);
            assert_eq!(payload.data.rows, vec![vec![json!("East")]]);
            assert!(payload.preview_markdown.contains("East"));
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn test_table_message_with_string_data() {
    let inner = json!({"columns": ["n"], "index": [0, 1], "data": [[1], [2]]}).to_string();
    let content = json!({"preview_markdown": "", "data_json": inner}).to_string();

    match directives(&content).as_slice() {
        [Directive::TablePayload(payload)] => assert_eq!(payload.data.len(), 2),
        other => panic!("expected one table, got {:?}", other),
    }
}

#[test]
fn test_malformed_table_is_skipped() {
    let content = r#"{"preview_markdown": "x", "data_json": {"columns": ["a"], "data": [[1, 2]]}}"#;
    assert!(extract("QueryAgent", content).is_empty());

    let broken = r#"{"data_json": "#;
    assert!(extract("QueryAgent", broken).is_empty());
}

#[test]
fn test_prose_mentioning_data_json_is_not_a_table() {
    let fragments = extract("AnalysisAgent", "The \"data_json\" field has 3 rows.");
    assert_eq!(
        fragments,
        vec![insight("AnalysisAgent", "The \"data_json\" field has 3 rows.")]
    );
}

#[test]
fn test_directive_kinds() {
    assert_eq!(Directive::ChartSpec(json!({})).kind(), DirectiveKind::Chart);
    assert_eq!(
        Directive::CodeSnippet(String::new()).kind(),
        DirectiveKind::Code
    );
}
