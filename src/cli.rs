//! Command-line interface for jumpline.
//!
//! Parses arguments using clap and provides the [`Cli`] struct containing
//! all user-specified options.

use crate::profile::FIELDS;
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for jumpline.
///
/// # Examples
///
/// ```bash
/// # Log in to dc.db1 through its jump hosts, using credential 1
/// jumpline login dc.db1 1
///
/// # Log in to every host under dc, nine panes per window
/// jumpline mlogin dc
///
/// # Print the resolved shell prompt of a node
/// jumpline show dc.db1 shell_prompt
/// ```
#[derive(Parser, Debug)]
#[command(name = "jumpline")]
#[command(version)]
#[command(about = "Multi-hop SSH login automation in tmux panes")]
#[command(long_about = "Jumpline logs in to hosts described by a directory of YAML files.\n\n\
    Each host may name a previous login; jumpline walks the chain of jump hosts,\n\
    answering password and OTP prompts in a tmux pane.")]
pub struct Cli {
    /// Settings file (default: ~/.config/jumpline/config.toml).
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Action {
    /// Log in to one node in a window named after it.
    Login {
        /// Node identifier (dot-separated path).
        node: String,
        /// Credential to use on every hop instead of asking.
        index: Option<usize>,
    },

    /// Log in to a node and all hosts below it, in tiled windows.
    Mlogin {
        /// Node identifier (dot-separated path).
        node: String,
        /// Credential to use on every hop instead of asking.
        index: Option<usize>,
    },

    /// Draw the node tree.
    Ls {
        /// Subtree to draw (default: everything).
        node: Option<String>,
    },

    /// Print one resolved field of a node. Passwords are masked.
    Show {
        node: String,
        #[arg(value_parser = PossibleValuesParser::new(FIELDS.iter().copied()), ignore_case = true)]
        field: String,
    },

    /// List node identifiers containing TEXT.
    Search {
        text: String,
        /// Only identifiers starting with TEXT.
        #[arg(long)]
        prefix: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_with_index() {
        let cli = Cli::try_parse_from(["jumpline", "login", "dc.db1", "1"]).unwrap();
        assert_eq!(
            cli.action,
            Action::Login {
                node: "dc.db1".to_string(),
                index: Some(1)
            }
        );
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["jumpline", "mlogin", "dc", "-c", "/tmp/j.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/j.toml")));
        assert_eq!(
            cli.action,
            Action::Mlogin {
                node: "dc".to_string(),
                index: None
            }
        );
    }

    #[test]
    fn test_show_checks_field_names() {
        assert!(Cli::try_parse_from(["jumpline", "show", "dc.db1", "shell_prompt"]).is_ok());
        assert!(Cli::try_parse_from(["jumpline", "show", "dc.db1", "colour"]).is_err());
    }

    #[test]
    fn test_search_prefix_flag() {
        let cli = Cli::try_parse_from(["jumpline", "search", "dc", "--prefix"]).unwrap();
        assert_eq!(
            cli.action,
            Action::Search {
                text: "dc".to_string(),
                prefix: true
            }
        );
        let cli = Cli::try_parse_from(["jumpline", "search", "db"]).unwrap();
        assert!(matches!(cli.action, Action::Search { prefix: false, .. }));
    }

    #[test]
    fn test_index_must_be_a_number() {
        assert!(Cli::try_parse_from(["jumpline", "login", "dc.db1", "first"]).is_err());
    }
}
