use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::cancel::CancelToken;
use crate::cli::Cli;

mod archive;
mod cancel;
mod cli;
mod collector;
mod config;
mod db;
mod domain;
mod errors;
mod normalize;
mod pipeline;
mod spreadsheets;


#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cancel = CancelToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            on_signal.cancel();
        }
    });

    // The browser session and the per-card workers all block.
    let outcome = tokio::task::spawn_blocking(move || cli::execute(cli, cancel)).await;

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Pipeline task aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
