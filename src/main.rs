use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use code_navigator::Engine;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for graph and listing output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting code-navigator v{}", env!("CARGO_PKG_VERSION"));

    // Create the engine with configuration
    let engine = Engine::new(cli.config.as_deref())?;

    // Execute the requested command
    cli.execute(engine).await
}
