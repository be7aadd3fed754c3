//! # Jumpline
//!
//! Multi-hop SSH login automation for tmux.
//!
//! Hosts are described by a directory tree of YAML files. Each file may name
//! the host it has to be reached through, and jumpline walks that chain of
//! jump hosts in a tmux pane: it types the login command, answers password
//! and one-time-password prompts, waits for the shell prompt and moves on to
//! the next hop.
//!
//! ## Features
//!
//! - **Inheritance**: a directory's `.base.yaml` applies to everything below it
//! - **Chains**: `PREVIOUS_LOGIN` back-links resolve into an ordered hop list
//! - **Secrets hooks**: passwords and TOTP seeds can come from an external command
//! - **Batch login**: every host under a node at once, tiled nine panes per window
//!
//! ## Quick Example
//!
//! ```yaml
//! # ~/.config/jumpline/hosts/.base.yaml
//! SHELL_PROMPT: "]$"
//! PASSWORD_PROMPT: "password:"
//! CREDENTIAL:
//!   - USER: ops
//!     SECRETS_HOOK: ["pass-json", "ops"]
//!
//! # ~/.config/jumpline/hosts/bastion.yaml
//! OTP_PROMPT: "Verification code:"
//!
//! # ~/.config/jumpline/hosts/dc/.base.yaml
//! PREVIOUS_LOGIN: bastion
//!
//! # ~/.config/jumpline/hosts/dc/db1.yaml
//! AFTER_HOOKS: ["cd /srv/db"]
//! ```
//!
//! `jumpline login dc.db1` logs in to `bastion`, then to `db1` from there.
//!
//! ## Architecture
//!
//! The crate is organized into these modules:
//!
//! - [`settings`]: application settings (TOML)
//! - [`loader`]: settings file discovery and loading
//! - [`cli`]: command-line argument parsing with clap
//! - [`tree`]: the node tree and lazy profile resolution
//! - [`profile`]: per-node YAML schema and inheritance
//! - [`property`]: multi-valued fields and interactive selection
//! - [`resolver`]: login chain resolution
//! - [`hop`]: a single login step
//! - [`login`]: chain orchestration and batch login
//! - [`pane`]: pane capability and prompt polling
//! - [`tiling`]: tiled window allocation
//! - [`tmux`]: tmux panes and windows
//! - [`secrets`]: secrets hooks
//! - [`otp`]: TOTP codes
//! - [`interpolate`]: login command rendering (`{user}`, `{host}`, `{port}`)
//! - [`logging`]: log file setup
//! - [`error`]: error types

pub mod cli;
pub mod error;
pub mod hop;
pub mod interpolate;
pub mod loader;
pub mod logging;
pub mod login;
pub mod otp;
pub mod pane;
pub mod profile;
pub mod property;
pub mod resolver;
pub mod secrets;
pub mod settings;
pub mod tiling;
pub mod tmux;
pub mod tree;

#[cfg(test)]
mod testing;

pub use error::{JumplineError, Result};
pub use login::{ChainReport, Orchestrator};
pub use settings::Settings;
pub use tree::{ConfigTree, NodeId};
