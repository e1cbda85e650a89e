use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

pub const DEFAULT_LOG_FILE: &str = "logs/dbperf.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] std::io::Error),
    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Filter directives for the `-v` count; summaries are always shown
pub fn directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    format!("{level},dbperf_runner::report=info")
}

/// Install a combined subscriber writing to the console and, if given, a plain text log file
///
/// `RUST_LOG` takes precedence over `verbosity`.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(verbosity)));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()?;

    Ok(())
}
