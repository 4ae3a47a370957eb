//! keysmith - code signing credential manager

mod cli;
mod exit_codes;

use std::path::PathBuf;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{output, Cli};

fn main() {
    let guard = init_tracing();

    let cli = Cli::parse();
    let code = match cli.execute() {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "command failed");
            output::error(&format!("{e:#}"));
            exit_codes::for_error(&e)
        }
    };

    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}

/// Install the console layer (`RUST_LOG`, default `warn`, on stderr) and,
/// when a home directory exists, a debug-level JSON log rolled daily under
/// `~/.keysmith/logs/`. The returned guard flushes the file writer on drop.
fn init_tracing() -> Option<WorkerGuard> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        );

    let (file, guard) = match log_directory() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "keysmith.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

fn log_directory() -> Option<PathBuf> {
    let dir = dirs::home_dir()?.join(".keysmith").join("logs");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
