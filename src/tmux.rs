//! Tmux panes and windows.
//!
//! [`TmuxSession`] is the real [`PaneHost`]: every login window lives in one
//! named session, created on demand. Windows and panes are addressed by
//! their tmux ids (`@3`, `%7`) rather than names, since node ids contain dots
//! and tmux reads a dot in a target as a pane separator.

use crate::error::{JumplineError, Result};
use crate::pane::{Input, Pane, PaneHost};
use std::process::Command;
use tracing::debug;

/// Check if we're running inside a tmux session.
///
/// Checks for the `TMUX` environment variable, which tmux sets when active.
pub fn in_tmux() -> bool {
    std::env::var("TMUX").is_ok()
}

/// Run tmux and return its stdout.
fn tmux(args: &[&str]) -> Result<String> {
    let output = Command::new("tmux")
        .args(args)
        .output()
        .map_err(|e| JumplineError::TmuxError(e.to_string()))?;

    if !output.status.success() {
        return Err(JumplineError::TmuxError(format!(
            "{} failed: {}",
            args.first().copied().unwrap_or("tmux"),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Last non-blank line of captured pane text, trimmed.
fn last_non_blank(captured: &str) -> String {
    captured
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Id of the window called `name` in `list-windows -F "#{window_id} #{window_name}"` output.
fn find_window_id(listing: &str, name: &str) -> Option<String> {
    listing
        .lines()
        .filter_map(|line| line.split_once(' '))
        .find(|(_, window)| *window == name)
        .map(|(id, _)| id.to_string())
}

/// A pane addressed by its tmux pane id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxPane {
    id: String,
}

impl TmuxPane {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Pane for TmuxPane {
    fn id(&self) -> &str {
        &self.id
    }

    /// Text is sent literally, so key names like `Enter` inside a password
    /// are not interpreted. Commands get a leading space to keep them out
    /// of the shell history.
    fn send_keys(&self, text: &str, input: Input) -> Result<()> {
        let typed = match input {
            Input::Command => {
                debug!(pane = %self.id, command = text, "send-keys");
                format!(" {}", text)
            }
            Input::Secret => text.to_string(),
        };
        tmux(&["send-keys", "-t", self.id.as_str(), "-l", typed.as_str()])?;
        tmux(&["send-keys", "-t", self.id.as_str(), "Enter"])?;
        Ok(())
    }

    fn last_line(&self) -> Result<String> {
        Ok(last_non_blank(&tmux(&["capture-pane", "-p", "-t", self.id.as_str()])?))
    }

    fn select(&self) -> Result<()> {
        tmux(&["select-window", "-t", self.id.as_str()])?;
        tmux(&["select-pane", "-t", self.id.as_str()])?;
        Ok(())
    }
}

/// The tmux session holding all login windows.
#[derive(Debug, Clone)]
pub struct TmuxSession {
    name: String,
}

impl TmuxSession {
    /// Attach to the session `name`, starting it detached if needed.
    ///
    /// # Errors
    ///
    /// [`JumplineError::TmuxError`] if tmux is missing or cannot start the
    /// session.
    pub fn open(name: &str) -> Result<Self> {
        let target = format!("={}", name);
        let exists = Command::new("tmux")
            .args(["has-session", "-t", target.as_str()])
            .output()
            .map_err(|e| JumplineError::TmuxError(e.to_string()))?
            .status
            .success();
        if !exists {
            debug!(session = name, "starting tmux session");
            tmux(&["new-session", "-d", "-s", name])?;
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> String {
        format!("={}:", self.name)
    }

    fn window_id(&self, window: &str) -> Result<Option<String>> {
        let session = format!("={}", self.name);
        let listing = tmux(&["list-windows", "-t", session.as_str(), "-F", "#{window_id} #{window_name}"])?;
        Ok(find_window_id(&listing, window))
    }

    /// Create the window `window` and return its id.
    fn new_window(&self, window: &str) -> Result<String> {
        let target = self.target();
        let id = tmux(&["new-window", "-t", target.as_str(), "-n", window, "-P", "-F", "#{window_id}"])?;
        Ok(id.trim().to_string())
    }
}

impl PaneHost for TmuxSession {
    type Pane = TmuxPane;

    fn pane_in_window(&self, window: &str) -> Result<TmuxPane> {
        let pane = match self.window_id(window)? {
            Some(id) => {
                let pane = tmux(&["split-window", "-t", id.as_str(), "-P", "-F", "#{pane_id}"])?;
                tmux(&["select-layout", "-t", id.as_str(), "tiled"])?;
                pane
            }
            None => {
                let id = self.new_window(window)?;
                tmux(&["list-panes", "-t", id.as_str(), "-F", "#{pane_id}"])?
            }
        };
        let pane = TmuxPane::new(last_non_blank(&pane));
        pane.select()?;
        Ok(pane)
    }

    fn window_panes(&self, window: &str, count: usize) -> Result<Vec<TmuxPane>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if let Some(old) = self.window_id(window)? {
            tmux(&["kill-window", "-t", old.as_str()])?;
        }

        let id = self.new_window(window)?;
        for _ in 1..count {
            tmux(&["split-window", "-t", id.as_str()])?;
            // Re-tile after every split so the next one has room.
            tmux(&["select-layout", "-t", id.as_str(), "tiled"])?;
        }

        let panes = tmux(&["list-panes", "-t", id.as_str(), "-F", "#{pane_id}"])?;
        Ok(panes
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(TmuxPane::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_non_blank_line() {
        let captured = "Last login: Mon\n[ops@db1 ~]$ \n\n   \n";
        assert_eq!(last_non_blank(captured), "[ops@db1 ~]$");
        assert_eq!(last_non_blank(""), "");
        assert_eq!(last_non_blank("\n\n"), "");
    }

    #[test]
    fn test_find_window_by_exact_name() {
        let listing = "@1 zsh\n@4 dc.db1-0\n@7 db1\n";
        assert_eq!(find_window_id(listing, "db1"), Some("@7".to_string()));
        assert_eq!(find_window_id(listing, "dc.db1-0"), Some("@4".to_string()));
        assert_eq!(find_window_id(listing, "db"), None);
    }

    #[test]
    fn test_window_names_may_contain_spaces() {
        let listing = "@2 my host\n";
        assert_eq!(find_window_id(listing, "my host"), Some("@2".to_string()));
    }
}
