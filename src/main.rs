//! papaw CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() {
    let cmd = cli::pack::PackCmd::parse();

    // Initialize logging based on RUST_LOG or default to warn
    init_logging();

    tracing::debug!(version = papaw::VERSION, "starting papaw");

    if let Err(e) = cmd.run() {
        tracing::error!(error = %e, "pack failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("papaw=warn,papaw_pack=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
