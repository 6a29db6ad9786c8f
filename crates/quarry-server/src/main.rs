//! Quarry server binary
//!
//! Loads configuration and starts the extraction HTTP service.

use clap::Parser;
use quarry_server::{config::ServerConfig, init_tracing, start_server, ServerError};
use std::path::PathBuf;
use std::process;

/// Question-driven content extraction service
#[derive(Debug, Parser)]
#[command(name = "quarry-server", version, about)]
struct Cli {
    /// Path to a TOML configuration file; environment variables override it
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    init_tracing();
    start_server(config).await
}
