//! Test doubles for panes and pane hosts.

use crate::error::Result;
use crate::pane::{Input, Pane, PaneHost};
use crate::property::{Choice, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
struct Screen {
    line: String,
    rules: Vec<(String, String)>,
    sent: Vec<(String, Input)>,
}

/// A pane whose screen changes when typed text contains a trigger.
///
/// Clones share the same screen, so a test can keep a handle on a pane that
/// was moved into the code under test.
#[derive(Debug, Clone)]
pub struct ScriptedPane {
    id: String,
    screen: Arc<Mutex<Screen>>,
}

impl ScriptedPane {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            screen: Arc::new(Mutex::new(Screen::default())),
        }
    }

    /// Set what the pane currently shows.
    pub fn showing(self, line: &str) -> Self {
        self.screen.lock().unwrap().line = line.to_string();
        self
    }

    /// After typing text containing `trigger`, the pane shows `response`.
    /// The first matching rule wins.
    pub fn on(self, trigger: &str, response: &str) -> Self {
        self.screen
            .lock()
            .unwrap()
            .rules
            .push((trigger.to_string(), response.to_string()));
        self
    }

    /// A new pane with the same rules and screen but its own history.
    pub fn fresh(&self, id: &str) -> Self {
        let mut screen = self.screen.lock().unwrap().clone();
        screen.sent.clear();
        Self {
            id: id.to_string(),
            screen: Arc::new(Mutex::new(screen)),
        }
    }

    /// Everything typed so far.
    pub fn sent(&self) -> Vec<(String, Input)> {
        self.screen.lock().unwrap().sent.clone()
    }

    /// Only the text typed so far.
    pub fn sent_text(&self) -> Vec<String> {
        self.sent().into_iter().map(|(text, _)| text).collect()
    }
}

impl Pane for ScriptedPane {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_keys(&self, text: &str, input: Input) -> Result<()> {
        let mut screen = self.screen.lock().unwrap();
        screen.sent.push((text.to_string(), input));
        let next = screen
            .rules
            .iter()
            .find(|(trigger, _)| text.contains(trigger.as_str()))
            .map(|(_, response)| response.clone());
        if let Some(next) = next {
            screen.line = next;
        }
        Ok(())
    }

    fn last_line(&self) -> Result<String> {
        Ok(self.screen.lock().unwrap().line.clone())
    }

    fn select(&self) -> Result<()> {
        Ok(())
    }
}

/// Hands out copies of a template pane and records what was asked for.
pub struct FakeHost {
    template: ScriptedPane,
    pub windows: Mutex<Vec<(String, usize)>>,
    pub panes: Mutex<Vec<ScriptedPane>>,
}

impl FakeHost {
    pub fn new(template: ScriptedPane) -> Self {
        Self {
            template,
            windows: Mutex::new(Vec::new()),
            panes: Mutex::new(Vec::new()),
        }
    }

    fn make(&self, id: String) -> ScriptedPane {
        let pane = self.template.fresh(&id);
        self.panes.lock().unwrap().push(pane.clone());
        pane
    }
}

impl PaneHost for FakeHost {
    type Pane = ScriptedPane;

    fn pane_in_window(&self, window: &str) -> Result<ScriptedPane> {
        self.windows.lock().unwrap().push((window.to_string(), 1));
        Ok(self.make(window.to_string()))
    }

    fn window_panes(&self, window: &str, count: usize) -> Result<Vec<ScriptedPane>> {
        self.windows.lock().unwrap().push((window.to_string(), count));
        Ok((0..count).map(|i| self.make(format!("{}.{}", window, i))).collect())
    }
}

/// Always answers the same index and counts the questions.
pub struct FixedSelector {
    answer: usize,
    calls: AtomicUsize,
}

impl FixedSelector {
    pub fn new(answer: usize) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Selector for FixedSelector {
    fn select(&self, _choice: &Choice<'_>) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}
