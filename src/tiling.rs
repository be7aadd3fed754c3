//! Tiled window allocation for batch logins.
//!
//! A batch login spreads its panes over windows named `<prefix>-<n>`, at
//! most [`MAX_PANES_PER_WINDOW`] panes each. The allocator remembers the next
//! free `n` per prefix, so running the same batch twice opens new windows
//! instead of replacing the previous ones.

use crate::error::Result;
use crate::pane::PaneHost;
use std::collections::HashMap;
use tracing::debug;

/// Tmux gets cramped beyond a 3x3 grid.
pub const MAX_PANES_PER_WINDOW: usize = 9;

/// One window to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    pub name: String,
    pub panes: usize,
}

/// Per-prefix window index table.
#[derive(Debug, Default)]
pub struct TiledAllocator {
    next: HashMap<String, usize>,
}

impl TiledAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve windows for `amount` panes under `prefix`.
    pub fn plan(&mut self, prefix: &str, amount: usize) -> Vec<WindowPlan> {
        if amount == 0 {
            return Vec::new();
        }
        let windows = amount.div_ceil(MAX_PANES_PER_WINDOW);
        let next = self.next.entry(prefix.to_string()).or_insert(0);
        let first = *next;
        *next += windows;

        (0..windows)
            .map(|i| WindowPlan {
                name: format!("{}-{}", prefix, first + i),
                panes: (amount - i * MAX_PANES_PER_WINDOW).min(MAX_PANES_PER_WINDOW),
            })
            .collect()
    }

    /// Create the planned windows on `host` and return all their panes in
    /// order.
    pub fn panes<H: PaneHost>(&mut self, host: &H, prefix: &str, amount: usize) -> Result<Vec<H::Pane>> {
        let mut panes = Vec::with_capacity(amount);
        for window in self.plan(prefix, amount) {
            debug!(window = %window.name, panes = window.panes, "creating tiled window");
            panes.extend(host.window_panes(&window.name, window.panes)?);
        }
        Ok(panes)
    }
}
