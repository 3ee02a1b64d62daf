// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gafferd: the Gaffer control plane daemon.
//!
//! Exit codes: 0 clean shutdown, 1 configuration or startup error,
//! 2 invariant violation.

use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gf_daemon::env::{Config, LogDestination};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gafferd", version, about = "Gaffer: chat-dispatched agent control plane")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control plane service (default)
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // `help` is handled by clap; with or without `run` we serve
    match cli.command {
        Some(Command::Run) | None => {}
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("gafferd: {err}");
            return ExitCode::from(1);
        }
    };

    let _log_guard = init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "gafferd starting");

    match gf_daemon::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "gafferd failed");
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log {
        LogDestination::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
        LogDestination::File(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file = path.file_name().unwrap_or(OsStr::new("gafferd.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
    }
}
