use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use kbserve::cli::commands::{handle_config, handle_serve, handle_status};
use kbserve::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "kbserve=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tokio::select! {
        result = run_command(cli.command, cli.verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("received shutdown signal, exiting");
        }
    }

    Ok(())
}

async fn run_command(command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Serve(args) => {
            handle_serve(args).await?;
        }
        Commands::Status => {
            handle_status(verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
