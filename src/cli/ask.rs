//! `council ask` - run the agent team on one question

use super::{friendly, render};
use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::Args;
use council_core::{run_messages, Error, SessionDispatcher};
use council_llm::{OpenAiConfig, OpenAiProvider};
use council_tools::{SchemaCache, SnippetSandbox};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct AskArgs {
    /// SQLite database file
    #[arg(long)]
    pub db: PathBuf,
    /// Business question
    #[arg(short, long)]
    pub question: String,
    /// Model identifier (overrides llm.model)
    #[arg(long)]
    pub model: Option<String>,
    /// Turn budget (overrides orchestrator.max_turns)
    #[arg(long)]
    pub max_turns: Option<usize>,
    /// Write the dashboard payload JSON here
    #[arg(long)]
    pub payload: Option<PathBuf>,
    /// Do not execute code snippets
    #[arg(long)]
    pub no_exec: bool,
}

pub async fn run(args: AskArgs, config: &AppConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let options = config
        .run_options(args.model.as_deref(), args.max_turns)
        .with_cancel(cancel.clone());

    let provider_config = OpenAiConfig::from_env()
        .map_err(|e| friendly(Error::from(e)))?
        .with_model(&options.model)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    let provider = Arc::new(OpenAiProvider::new(provider_config));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the run");
                cancel.cancel();
            }
        }
    });

    let sandbox = if args.no_exec {
        None
    } else {
        config.sandbox_config().map(SnippetSandbox::new)
    };
    let mut session = SessionDispatcher::new(&args.question, sandbox);
    let cache = SchemaCache::new(config.schema.cache_capacity);

    info!(db = %args.db.display(), model = %options.model, max_turns = options.max_turns, "Asking");
    let mut stream = run_messages(&args.db, &args.question, &options, provider, &cache)
        .await
        .map_err(friendly)?;

    let mut failure = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(message) => {
                for event in session.ingest(&message).await {
                    render::event(&event);
                }
            }
            Err(e) => {
                render::event(&session.record_run_error(&e));
                failure = Some(e);
                break;
            }
        }
    }
    drop(stream);

    if cancel.is_cancelled() {
        warn!("Run cancelled before the turn budget was spent");
    }

    let state = session.into_state();
    render::summary(&state);

    if let Some(path) = &args.payload {
        let payload = state.to_dashboard_payload().map_err(friendly)?;
        let text = serde_json::to_string_pretty(&payload).context("Failed to encode payload")?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Dashboard payload written");
    }

    match failure {
        Some(e) => Err(friendly(e)),
        None => Ok(()),
    }
}
