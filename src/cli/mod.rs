//! CLI module for Council
//!
//! Provides commands:
//! - `ask`: answer a question over a database, streaming agent output
//! - `schema`: print the schema description the agents receive
//! - `config`: print the effective configuration

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use council_core::{format_error_for_cli, Error};

pub mod ask;
pub mod config;
pub mod render;
pub mod schema;

/// Council CLI
#[derive(Parser, Debug)]
#[command(name = "council")]
#[command(about = "Multi-agent answers to business questions over SQLite")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a business question
    Ask(ask::AskArgs),
    /// Describe the tables in a database
    Schema(schema::SchemaArgs),
    /// Show the effective configuration
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Ask(args)) => ask::run(args, &config).await,
        Some(Commands::Schema(args)) => schema::run(args, &config).await,
        Some(Commands::Config) => config::run(&config),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Convert a library error into a CLI error carrying the friendly text
pub(crate) fn friendly(error: Error) -> anyhow::Error {
    anyhow::anyhow!(format_error_for_cli(&error).trim_end().to_string())
}
