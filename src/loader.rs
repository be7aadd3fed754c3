//! Settings file discovery and loading.
//!
//! The search order is:
//!
//! 1. An explicit `--config` path (must exist)
//! 2. `$XDG_CONFIG_HOME/jumpline/config.toml`
//! 3. `~/.config/jumpline/config.toml`
//! 4. Platform default (e.g., `~/Library/Application Support` on macOS)
//!
//! When none of the implicit locations exists, built-in defaults are used.

use crate::error::{JumplineError, Result};
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find an existing settings file in the implicit locations.
///
/// Returns `Ok(None)` when no file exists anywhere.
///
/// # Errors
///
/// Returns [`JumplineError::NoConfigDir`] if the home directory cannot be determined.
pub fn default_config_path() -> Result<Option<PathBuf>> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg).join("jumpline").join("config.toml");
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let home = dirs::home_dir().ok_or(JumplineError::NoConfigDir)?;
    let path = home.join(".config").join("jumpline").join("config.toml");
    if path.exists() {
        return Ok(Some(path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("jumpline").join("config.toml");
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Load and parse a settings file from the given path.
///
/// # Errors
///
/// - [`JumplineError::ConfigNotFound`] if the file doesn't exist
/// - [`JumplineError::IoError`] if reading fails
/// - [`JumplineError::ParseError`] if TOML parsing fails
pub fn load_config(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(JumplineError::ConfigNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let settings = Settings::from_str(&contents)?;
    debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}

/// Load settings from `explicit` if given, otherwise from the default path,
/// falling back to [`Settings::default`].
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path()? {
        Some(path) => load_config(&path),
        None => Ok(Settings::default()),
    }
}
