//! Log file setup.
//!
//! Logins type into tmux panes while the operator watches the terminal, so
//! logs go to a file instead of stderr.

use crate::error::{JumplineError, Result};
use crate::settings::Settings;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` if set, else the configured level.
pub fn create_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(level))
}

/// Filter for a configured level, `info` if it does not parse.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `settings.log_file`.
///
/// # Errors
///
/// - [`JumplineError::IoError`] if the log file cannot be opened
/// - [`JumplineError::Logging`] if a subscriber is already installed
pub fn init(settings: &Settings) -> Result<()> {
    if let Some(dir) = settings.log_file.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(create_env_filter(&settings.log_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| JumplineError::Logging(e.to_string()))
}
