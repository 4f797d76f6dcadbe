//! filedeck CLI entry point

use clap::Parser;
use filedeck::cli::{Cli, Commands};
use filedeck::core::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("FILEDECK_LOG"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => filedeck::cli::serve::run(args).await,
        Commands::Tree(args) => filedeck::cli::tree::run(args),
    }
}
