//! On-demand query feeds: named, user-requested sources appended after
//! initial composition.
//!
//! Each feed is keyed by name; re-requesting a live name is a no-op, so no
//! duplicate feeds and no duplicate network calls are ever created. Feeds are
//! never removed or replaced, only torn down with the owning view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One result payload from a query feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryBatch {
    /// Result items; opaque to composition.
    pub items: Vec<serde_json::Value>,
    /// Total matching document count reported by the backend.
    pub total_docs: u64,
}

/// Live state of one named query feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFeedState {
    /// Most recent payload; `None` until the feed first resolves.
    pub latest: Option<QueryBatch>,
}

impl QueryFeedState {
    /// Reported document count, `0` before the first payload.
    #[must_use]
    pub fn total_docs(&self) -> u64 {
        self.latest.as_ref().map_or(0, |b| b.total_docs)
    }
}

/// The set of live query feeds, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFeeds {
    feeds: IndexMap<String, QueryFeedState>,
}

impl QueryFeeds {
    /// An empty feed set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a feed with this name is live.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.feeds.contains_key(name)
    }

    /// Register a new feed. Returns `false` (and changes nothing) when the
    /// name is already live; duplicate suppression is keyed purely on name
    /// equality.
    pub fn register(&mut self, name: &str) -> bool {
        if self.feeds.contains_key(name) {
            return false;
        }
        self.feeds.insert(name.to_string(), QueryFeedState::default());
        true
    }

    /// Record a payload for a live feed. Payloads for unknown names are
    /// ignored (the feed was never registered in this composer).
    pub fn apply_batch(&mut self, name: &str, batch: QueryBatch) {
        if let Some(state) = self.feeds.get_mut(name) {
            state.latest = Some(batch);
        }
    }

    /// Iterate feeds in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryFeedState)> {
        self.feeds.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of live feeds, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.feeds.keys().cloned().collect()
    }

    /// Number of live feeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Whether no feeds are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_suppresses_duplicates() {
        let mut feeds = QueryFeeds::new();
        assert!(feeds.register("strings"));
        assert!(!feeds.register("strings"));
        assert_eq!(feeds.len(), 1);
    }

    #[test]
    fn total_docs_defaults_to_zero() {
        let mut feeds = QueryFeeds::new();
        feeds.register("hits");
        let (_, state) = feeds.iter().next().unwrap();
        assert_eq!(state.total_docs(), 0);
    }

    #[test]
    fn apply_batch_updates_latest() {
        let mut feeds = QueryFeeds::new();
        feeds.register("hits");
        feeds.apply_batch(
            "hits",
            QueryBatch {
                items: vec![serde_json::json!({"doc": 1})],
                total_docs: 7,
            },
        );
        let (_, state) = feeds.iter().next().unwrap();
        assert_eq!(state.total_docs(), 7);
    }

    #[test]
    fn apply_batch_ignores_unknown_names() {
        let mut feeds = QueryFeeds::new();
        feeds.apply_batch("ghost", QueryBatch::default());
        assert!(feeds.is_empty());
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut feeds = QueryFeeds::new();
        feeds.register("b");
        feeds.register("a");
        assert_eq!(feeds.names(), ["b", "a"]);
    }
}
