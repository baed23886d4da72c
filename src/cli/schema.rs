//! `council schema` - print what the planning agent sees

use crate::config::AppConfig;
use anyhow::Result;
use clap::Args;
use council_core::Error;
use council_tools::SchemaCache;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// SQLite database file
    #[arg(long)]
    pub db: PathBuf,
}

pub async fn run(args: SchemaArgs, config: &AppConfig) -> Result<()> {
    let cache = SchemaCache::new(config.schema.cache_capacity);
    let schema = cache
        .describe(&args.db)
        .await
        .map_err(|e| super::friendly(Error::Store(e.to_string())))?;
    println!("{}", schema);
    Ok(())
}
