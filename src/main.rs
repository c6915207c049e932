//! nli-probe - Main Entry Point
//!
//! Sweeps logistic regression probes over sentence embeddings and reports the best one.

use clap::Parser;
use nli_probe::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nli_probe=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}
