//! Application settings for jumpline.
//!
//! Settings live in a small TOML file and only hold process-wide defaults.
//! Everything host specific lives in the node tree under `root`.
//!
//! # Config Format
//!
//! ```toml
//! root = "~/.config/jumpline/hosts"
//! login_format = "ssh -p {port} {user}@{host}"
//! session = "login"
//! log_file = "/tmp/jumpline/jumpline.log"
//! log_level = "debug"
//! previous_login = "reject"
//!
//! [wait]
//! timeout_secs = 30
//! poll_interval_ms = 100
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Login format used for the first hop when no node declares `LOGIN_FORMAT`.
pub const DEFAULT_LOGIN_FORMAT: &str = "ssh -p {port} {user}@{host}";

/// How to pick a `PREVIOUS_LOGIN` target when several nodes share the name.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Take the first node in walk order and log a warning.
    #[default]
    First,
    /// Fail the chain and list the candidates.
    Reject,
}

/// Timing for prompt polling.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WaitSettings {
    /// Ceiling for a single wait-for-prompt step.
    pub timeout_secs: u64,
    /// Sleep between two captures of the pane.
    pub poll_interval_ms: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            poll_interval_ms: 100,
        }
    }
}

impl WaitSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level settings structure.
///
/// Every field is optional in the file; missing ones take the defaults
/// documented on [`Settings::default`].
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Root directory of the node tree.
    pub root: PathBuf,
    /// Login format for the first hop.
    pub login_format: String,
    /// Name of the tmux session hosting login windows.
    pub session: String,
    /// Where tracing output goes.
    pub log_file: PathBuf,
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_level: String,
    /// Tie-break rule for ambiguous `PREVIOUS_LOGIN` names.
    pub previous_login: AmbiguityPolicy,
    /// Prompt polling timing.
    pub wait: WaitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let config_dir = dirs::home_dir()
            .map(|home| home.join(".config"))
            .unwrap_or_else(std::env::temp_dir)
            .join("jumpline");
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("jumpline");
        Self {
            root: config_dir.join("hosts"),
            login_format: DEFAULT_LOGIN_FORMAT.to_string(),
            session: "login".to_string(),
            log_file: data_dir.join("jumpline.log"),
            log_level: "info".to_string(),
            previous_login: AmbiguityPolicy::default(),
            wait: WaitSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string and expand `~` in paths.
    ///
    /// # Errors
    ///
    /// Returns `toml::de::Error` if the TOML is malformed or doesn't match
    /// the expected structure.
    pub fn from_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Settings = toml::from_str(toml_str)?;
        settings.root = expand_tilde(&settings.root);
        settings.log_file = expand_tilde(&settings.log_file);
        Ok(settings)
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
