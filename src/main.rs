//! Jumpline CLI entry point.
//!
//! This binary provides the `jumpline` command for logging in to hosts
//! through chains of jump hosts inside tmux.

use clap::Parser;
use jumpline::cli::{Action, Cli};
use jumpline::error::Result;
use jumpline::login::{ChainReport, Orchestrator};
use jumpline::property::PromptSelector;
use jumpline::settings::Settings;
use jumpline::tmux::{self, TmuxSession};
use jumpline::tree::ConfigTree;
use jumpline::{JumplineError, loader, logging};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = loader::load_settings(cli.config.as_deref())?;
    logging::init(&settings)?;
    let tree = ConfigTree::build(&settings.root);

    match cli.action {
        Action::Login { node, index } => run_login(&tree, &settings, &node, index, false),
        Action::Mlogin { node, index } => run_login(&tree, &settings, &node, index, true),
        Action::Ls { node } => {
            let id = node.unwrap_or_default();
            let found = tree.get(&id).ok_or(JumplineError::NodeNotFound(id))?;
            print!("{}", tree.render(found));
            Ok(())
        }
        Action::Show { node, field } => {
            let found = tree
                .get(&node)
                .ok_or_else(|| JumplineError::NodeNotFound(node.clone()))?;
            let profile = tree.profile(found)?;
            if let Some(value) = profile.field(&field.to_lowercase()) {
                println!("{}", value);
            }
            Ok(())
        }
        Action::Search { text, prefix } => {
            let found = if prefix { tree.list(&text) } else { tree.search(&text) };
            for id in found {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

/// Log in to one node, or to every batch target under it.
fn run_login(tree: &ConfigTree, settings: &Settings, node: &str, index: Option<usize>, batch: bool) -> Result<()> {
    let session = TmuxSession::open(&settings.session)?;
    let selector = PromptSelector::new();
    let mut orchestrator = Orchestrator::new(tree, settings, &selector).with_credential_index(index);

    if batch {
        for (_, report) in orchestrator.batch_login(&session, node)? {
            print_report(&report);
        }
    } else {
        print_report(&orchestrator.login_node(&session, node)?);
    }

    if !tmux::in_tmux() {
        println!("\nAttach with: tmux attach -t {}", session.name());
    }
    Ok(())
}

fn print_report(report: &ChainReport) {
    println!("{}", report);
}
