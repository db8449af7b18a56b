//! Derived counters: the notable-pane badge.

use crate::pane::PaneSpec;

/// Count the panes that contribute to the badge.
#[must_use]
pub fn notable_count(panes: &[PaneSpec]) -> usize {
    panes.iter().filter(|p| p.notable).count()
}

/// Deduplicating badge tracker: reports a count only when it changed.
#[derive(Debug, Default)]
pub struct BadgeTracker {
    last: Option<usize>,
}

impl BadgeTracker {
    /// A tracker that has emitted nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a rebuilt pane list; returns the new count when it differs
    /// from the last reported one.
    pub fn observe(&mut self, panes: &[PaneSpec]) -> Option<usize> {
        let count = notable_count(panes);
        if self.last == Some(count) {
            return None;
        }
        self.last = Some(count);
        Some(count)
    }
}
