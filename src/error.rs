//! Error types for jumpline.
//!
//! All errors in jumpline are represented by [`JumplineError`], which covers
//! settings and node file problems, chain resolution, hop failures and tmux
//! failures. None of them is fatal to a running chain orchestrator: hop and
//! chain errors are caught and reported per chain.

use std::path::PathBuf;
use thiserror::Error;

/// A node file that could not be turned into a profile.
///
/// Kept `Clone` so a failed resolution can be cached on the node like a
/// successful one.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {message}", path.display())]
pub struct ConfigError {
    /// The offending YAML file.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}

impl ConfigError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// All possible errors that can occur in jumpline.
#[derive(Error, Debug)]
pub enum JumplineError {
    /// Settings file does not exist at the given path.
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Could not determine the user's config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Settings TOML parsing failed.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A node file is malformed.
    #[error("Invalid node config {0}")]
    Config(#[from] ConfigError),

    /// No node has the requested identifier.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The node is a grouping directory, it has nothing to log in to.
    #[error("There is no host in {0}")]
    NoHost(String),

    /// `PREVIOUS_LOGIN` names a node that does not exist.
    #[error("Previous login '{name}' of {node} not found")]
    PreviousLoginNotFound {
        /// Node declaring the back-link.
        node: String,
        /// The dangling name.
        name: String,
    },

    /// `PREVIOUS_LOGIN` matches several nodes and the policy refuses to guess.
    #[error("Previous login '{name}' is ambiguous: {}", candidates.join(", "))]
    AmbiguousPreviousLogin {
        /// The ambiguous name.
        name: String,
        /// Identifiers of every node carrying that name.
        candidates: Vec<String>,
    },

    /// Back-links form a cycle (A -> B -> A).
    #[error("Circular login chain detected at {0}")]
    CircularLogin(String),

    /// Back-links go deeper than the hop budget.
    #[error("Login chain for {0} exceeds {1} hops")]
    ChainTooLong(String, usize),

    /// The credential property resolved to no value.
    #[error("No credential found for {0}")]
    NoCredential(String),

    /// A password prompt showed up but the credential yields no password.
    #[error("No password available for {0}")]
    NoPassword(String),

    /// A prompt did not show up before the timeout.
    #[error("Timed out waiting for {prompt:?} on {node}")]
    PromptTimeout {
        /// Node being logged in.
        node: String,
        /// Prompt(s) that were expected.
        prompt: String,
    },

    /// The prompt needed for this step is not configured.
    #[error("{field} is not configured for {node}")]
    MissingPrompt {
        /// Node being logged in.
        node: String,
        /// Missing key.
        field: &'static str,
    },

    /// The secrets hook failed or printed something unusable.
    #[error("Secrets hook failed: {0}")]
    SecretsHook(String),

    /// The secrets hook printed invalid JSON.
    #[error("Secrets hook printed invalid JSON: {0}")]
    SecretsJson(#[from] serde_json::Error),

    /// One-time password generation failed.
    #[error("OTP error: {0}")]
    Otp(String),

    /// The operator closed input while being asked to choose a value.
    #[error("Selection aborted for {0}")]
    SelectionAborted(String),

    /// A selector answered with an index that names no value.
    #[error("Selection {index} is out of range for {node}")]
    InvalidSelection {
        /// Node being resolved.
        node: String,
        /// The index the selector returned.
        index: usize,
    },

    /// The log subscriber could not be installed.
    #[error("Failed to set up logging: {0}")]
    Logging(String),

    /// A tmux command failed to execute.
    #[error("Tmux error: {0}")]
    TmuxError(String),
}

/// Convenient Result type alias for jumpline operations.
pub type Result<T> = std::result::Result<T, JumplineError>;
