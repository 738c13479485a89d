//! todoflow - command-line shell over todoflow-core
//!
//! The list lives in a JSON file (`data_file` in `todoflow.toml`).

mod cli;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::Cli;

fn init_tracing(fallback: &str) {
    // RUST_LOG が優先。不正な値は無視して設定ファイルの値を使う
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .or_else(|| EnvFilter::try_new(fallback).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    match cli.run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
