//! `council config` - print the effective configuration

use crate::config::AppConfig;
use anyhow::{Context, Result};

pub fn run(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered);
    Ok(())
}
