//! Trialcast binary entry point.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trialcast::AppError;
use trialcast::cli::Cli;
use trialcast::trialcast_core::render_error;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trialcast=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Predict(e)) => {
            eprintln!("{}", render_error(&e).to_text());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
