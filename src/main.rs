//! pew-resolve CLI
//!
//! Entry point for the pew-resolve command-line application.

use anyhow::Result;
use clap::Parser;

use pew_resolve::cli::output::{display_error, OutputConfig};
use pew_resolve::cli::Cli;
use pew_resolve::config::defaults;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // Logs go to stderr; stdout carries outputs and workflow commands
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(output_config.log_level().into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(
        "pew-resolve {} ({})",
        env!("CARGO_PKG_VERSION"),
        defaults::GIT_SHA
    );

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
