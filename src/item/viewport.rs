//! Viewport visibility tracking for list rows

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    Enter,
    Exit,
}

/// Visibility of one row
pub trait ViewportWatcher {
    fn is_in_viewport(&self) -> bool;
}

/// Hands out watchers for rows, keyed by a stable row key
pub trait ViewportMonitor {
    fn create(&self, key: &str) -> Box<dyn ViewportWatcher>;
}

/// Monitor fed with the set of row keys currently on screen
///
/// The UI loop reports the visible keys after every scroll and dispatches the
/// returned transitions to the matching rows.
#[derive(Clone, Default)]
pub struct ScrollMonitor {
    visible: Rc<RefCell<HashSet<String>>>,
}

struct ScrollWatcher {
    key: String,
    visible: Rc<RefCell<HashSet<String>>>,
}

impl ViewportWatcher for ScrollWatcher {
    fn is_in_viewport(&self) -> bool {
        self.visible.borrow().contains(&self.key)
    }
}

impl ScrollMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the visible set, returning exits before enters
    pub fn update<I, S>(&self, keys: I) -> Vec<(String, ViewportEvent)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next: HashSet<String> = keys.into_iter().map(Into::into).collect();
        let mut visible = self.visible.borrow_mut();

        let mut exits: Vec<String> = visible.difference(&next).cloned().collect();
        let mut enters: Vec<String> = next.difference(&visible).cloned().collect();
        exits.sort();
        enters.sort();
        *visible = next;

        exits
            .into_iter()
            .map(|k| (k, ViewportEvent::Exit))
            .chain(enters.into_iter().map(|k| (k, ViewportEvent::Enter)))
            .collect()
    }
}

impl ViewportMonitor for ScrollMonitor {
    fn create(&self, key: &str) -> Box<dyn ViewportWatcher> {
        Box::new(ScrollWatcher {
            key: key.to_string(),
            visible: Rc::clone(&self.visible),
        })
    }
}
