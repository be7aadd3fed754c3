//! Terminal pane capability and prompt polling.
//!
//! The login engine never talks to tmux directly. It types into a [`Pane`]
//! and watches the pane's last rendered line; panes come from a
//! [`PaneHost`]. [`crate::tmux`] provides the real implementation.

use crate::error::Result;
use std::thread;
use std::time::{Duration, Instant};

/// How a line of input should be treated by the pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A shell command, kept out of the local shell history.
    Command,
    /// A password or one-time code, typed verbatim and never logged.
    Secret,
}

/// A terminal surface that accepts keystrokes and exposes its output.
pub trait Pane: Send {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Type `text` followed by Enter.
    fn send_keys(&self, text: &str, input: Input) -> Result<()>;

    /// Last non-blank rendered line, trimmed.
    fn last_line(&self) -> Result<String>;

    /// Focus the pane.
    fn select(&self) -> Result<()>;
}

/// Source of panes.
pub trait PaneHost {
    type Pane: Pane;

    /// A new pane in the window called `window`, creating the window if
    /// needed and splitting it otherwise.
    fn pane_in_window(&self, window: &str) -> Result<Self::Pane>;

    /// A fresh window called `window` tiled into `count` panes. An existing
    /// window of that name is replaced.
    fn window_panes(&self, window: &str, count: usize) -> Result<Vec<Self::Pane>>;
}

/// Timing for a single wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Whether `line` ends with `prompt`, ignoring surrounding whitespace.
pub fn matches_prompt(line: &str, prompt: &str) -> bool {
    let prompt = prompt.trim();
    !prompt.is_empty() && line.trim().ends_with(prompt)
}

/// Poll `pane` until its last line ends with one of `prompts`.
///
/// Returns the index of the first matching prompt, or `None` on timeout.
/// `None` entries in `prompts` never match.
pub fn wait_until_any<P: Pane + ?Sized>(
    pane: &P,
    prompts: &[Option<&str>],
    wait: Wait,
) -> Result<Option<usize>> {
    let started = Instant::now();
    loop {
        let line = pane.last_line()?;
        let hit = prompts
            .iter()
            .position(|p| p.is_some_and(|p| matches_prompt(&line, p)));
        if hit.is_some() {
            return Ok(hit);
        }
        if started.elapsed() >= wait.timeout {
            return Ok(None);
        }
        thread::sleep(wait.interval);
    }
}

/// Poll `pane` until its last line ends with `prompt`. `false` on timeout.
pub fn wait_until<P: Pane + ?Sized>(pane: &P, prompt: &str, wait: Wait) -> Result<bool> {
    Ok(wait_until_any(pane, &[Some(prompt)], wait)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPane;

    fn quick() -> Wait {
        Wait::new(Duration::from_millis(50), Duration::from_millis(5))
    }

    #[test]
    fn test_matches_prompt() {
        assert!(matches_prompt("[ops@db1 ~]$ ", "]$"));
        assert!(matches_prompt("ops@bastion's Password:", "Password: "));
        assert!(!matches_prompt("Last login: yesterday", "$"));
        assert!(!matches_prompt("anything", "  "));
    }

    #[test]
    fn test_wait_until_any_reports_matching_prompt() {
        let pane = ScriptedPane::new("p").showing("ops@db1's password:");
        let hit = wait_until_any(&pane, &[None, Some("password:"), Some("$")], quick()).unwrap();
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn test_wait_times_out() {
        let pane = ScriptedPane::new("p").showing("connecting...");
        let started = Instant::now();
        assert!(!wait_until(&pane, "$", quick()).unwrap());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
