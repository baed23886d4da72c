//! Council - multi-agent answers to business questions over SQLite
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;

const DEFAULT_LOG_FILTER: &str = "council=info,council_core=info,council_tools=info,council_llm=info";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = config::load_config()?;
    let _guard = init_tracing(&config.logging);
    debug!(?config, "Configuration loaded");

    let cli = cli::Cli::parse();
    cli::run(cli, config).await
}

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live until exit.
fn init_tracing(logging: &config::LoggingSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &logging.log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "council.log"));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}
