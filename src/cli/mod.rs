//! CLI module for the knowledge-base service.

pub mod commands;

use clap::{Parser, Subcommand};

/// Knowledge-base ingestion and retrieval service.
#[derive(Debug, Parser)]
#[command(name = "kbserve")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'v', global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(commands::ServeArgs),

    /// Check infrastructure status (database, vector store)
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
