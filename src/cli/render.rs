//! Terminal rendering of session events

use council_core::{ExecutedArtifact, SessionEvent, SessionState};
use serde_json::Value;

/// Print one event
pub fn event(event: &SessionEvent) {
    match event {
        SessionEvent::Insight { source, text } => println!("💬 {}: {}", source, text),
        SessionEvent::Chart { spec } => {
            let mark = spec
                .get("mark")
                .map(|m| m.get("type").unwrap_or(m))
                .and_then(Value::as_str)
                .unwrap_or("?");
            println!("📊 Chart spec (mark {})", mark);
        }
        SessionEvent::ChartError { error } => println!("⚠️  Chart spec skipped: {}", error),
        SessionEvent::Frame {
            preview_markdown,
            rows,
        } => {
            println!("🧮 Query result ({} rows)", rows);
            if !preview_markdown.is_empty() {
                println!("{}", preview_markdown);
            }
        }
        SessionEvent::Executed { artifact } => match artifact {
            ExecutedArtifact::Chart { .. } => println!("🖼️  Snippet produced a chart"),
            ExecutedArtifact::Figure { png_base64 } => {
                println!("🖼️  Snippet produced a figure ({} bytes base64)", png_base64.len())
            }
        },
        SessionEvent::ExecutionFailed { error } => println!("⚠️  Snippet failed: {}", error),
        SessionEvent::SnippetNoOp => println!("ℹ️  Snippet set neither `chart` nor `fig`"),
        SessionEvent::SnippetSkipped => println!("ℹ️  Snippet not executed (--no-exec)"),
        SessionEvent::ToolFailed { source, error } => {
            println!("⚠️  {} query failed: {}", source, error)
        }
        SessionEvent::AgentError { source, message } => {
            println!("⚠️  {} turn failed: {}", source, message)
        }
        SessionEvent::RunError { message } => println!("❌ Run aborted: {}", message),
    }
}

/// Print the closing summary
pub fn summary(state: &SessionState) {
    println!();
    println!(
        "✅ {} insights, {} charts, {} tables, {} snippet artifacts, {} errors",
        state.insights.len(),
        state.charts.len(),
        state.frames.len(),
        state.executed.len(),
        state.errors.len()
    );
}
