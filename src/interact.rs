//! Click disambiguation and the in-place edit lifecycle.
//!
//! A single click means "expand this leaf", a double click means "edit this
//! label", and the two can only be told apart by waiting: the first press
//! arms a timer, a second press inside the window cancels it and wins. The
//! window is global, not per-node — pressing node A then quickly node B
//! edits B. Focus mode pre-empts both branches and never arms the timer.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

/// Delay before a lone click is committed as an expansion.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// What a press resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Timer armed; call [`ClickArbiter::fire`] once the deadline passes.
    Armed,
    /// Double click: edit the node under the *second* press.
    Edit(u64),
    /// Focus mode: highlight the ancestor/descendant path of this node.
    Focus(u64),
}

/// Idle → Pending(deadline) → Expand | Edit, one pending press at a time.
pub struct ClickArbiter {
    window: Duration,
    pending: Option<(u64, Instant)>,
}

impl Default for ClickArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickArbiter {
    pub fn new() -> Self {
        Self::with_window(DOUBLE_CLICK_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn press(&mut self, node: u64, focus_mode: bool) -> ClickAction {
        if let Some((_, deadline)) = self.pending.take() {
            if Instant::now() < deadline {
                return ClickAction::Edit(node);
            }
            // The window expired without the driver firing; treat this press
            // as a fresh first click.
        }
        if focus_mode {
            return ClickAction::Focus(node);
        }
        self.pending = Some((node, Instant::now() + self.window));
        ClickAction::Armed
    }

    /// Deadline the driver loop should sleep until, if a press is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// Commit the pending press as an expansion once its window has elapsed.
    /// Returns the node to expand, or `None` if nothing is due.
    pub fn fire(&mut self) -> Option<u64> {
        match self.pending {
            Some((node, deadline)) if Instant::now() >= deadline => {
                self.pending = None;
                Some(node)
            }
            _ => None,
        }
    }

    /// Drop the pending press without expanding (map closed, mode switch).
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// An in-place label edit. Created on the Edit transition with the full text
/// selected; dropped on confirm or cancel, so re-entering edit mode can
/// never stack handlers.
#[derive(Debug, Clone)]
pub struct EditSession {
    node_id: u64,
    original: String,
    buffer: String,
    select_all: bool,
}

impl EditSession {
    pub fn begin(node_id: u64, original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            node_id,
            buffer: original.clone(),
            original,
            select_all: true,
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Typed input. The first insertion replaces the selected-on-focus text.
    pub fn insert(&mut self, text: &str) {
        if self.select_all {
            self.buffer.clear();
            self.select_all = false;
        }
        self.buffer.push_str(text);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
        self.select_all = false;
    }

    /// Confirmed result: node and the text to write back.
    pub fn into_confirmed(self) -> (u64, String) {
        (self.node_id, self.buffer)
    }

    /// The unchanged label, for a cancel.
    pub fn original(&self) -> &str {
        &self.original
    }
}

/// Pending expansions keyed by path. A second expansion of a node whose
/// request is still in flight is rejected instead of racing it.
#[derive(Debug, Default)]
pub struct InFlight {
    paths: HashSet<Vec<String>>,
}

impl InFlight {
    pub fn try_begin(&mut self, path: &[String]) -> bool {
        self.paths.insert(path.to_vec())
    }

    pub fn finish(&mut self, path: &[String]) {
        self.paths.remove(path);
    }

    pub fn contains(&self, path: &[String]) -> bool {
        self.paths.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
