//! Config command implementation.

use anyhow::Result;
use clap::Subcommand;

use crate::models::Config;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration as TOML
    Show,

    /// Write a default config file if none exists
    Init,

    /// Print the config file path
    Path,
}

pub async fn handle_config(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let mut config = Config::load()?;
            // Never echo secrets back to the terminal
            if config.embedding.api_key.is_some() {
                config.embedding.api_key = Some("<redacted>".to_string());
            }
            if config.vector_store.api_key.is_some() {
                config.vector_store.api_key = Some("<redacted>".to_string());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Init => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            if path.exists() {
                println!("Config already exists: {}", path.display());
            } else {
                Config::default().save()?;
                println!("Wrote default config: {}", path.display());
            }
        }
        ConfigCommand::Path => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
