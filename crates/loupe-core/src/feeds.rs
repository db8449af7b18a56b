//! Upstream feed abstraction: the API client seen from composition.
//!
//! The composer never talks to a transport directly. It consumes a
//! [`ArtifactBackend`], whose methods each open one push-based subscription:
//! a channel that delivers zero or more values over time and never completes
//! on its own (teardown closes it). A feed that errors delivers `Err` and is
//! then allowed to close; previously delivered values stay in effect.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::error::FeedError;
use crate::query::QueryBatch;
use crate::record::{ArtifactId, InstanceIndex, StreamRecord};

// =============================================================================
// Source identification
// =============================================================================

/// Which upstream source an event or failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The artifact's stream records feed.
    Streams,
    /// The tool instance index feed.
    Instances,
    /// The has-content flag feed.
    HasContent,
    /// The template registry snapshot feed.
    Registry,
    /// An on-demand query feed.
    Query,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streams => write!(f, "streams"),
            Self::Instances => write!(f, "instances"),
            Self::HasContent => write!(f, "has_content"),
            Self::Registry => write!(f, "registry"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// A surfaced upstream failure. Composed panes are left intact; the owning
/// view decides how to present and retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFailure {
    /// Source that failed.
    pub source: SourceKind,
    /// Feed name, for query sources.
    pub feed: Option<String>,
    /// Human-readable failure message.
    pub message: String,
}

impl FeedFailure {
    /// Build a failure record from a feed error.
    #[must_use]
    pub fn from_error(source: SourceKind, feed: Option<String>, error: &FeedError) -> Self {
        Self {
            source,
            feed,
            message: error.to_string(),
        }
    }
}

// =============================================================================
// Backend trait
// =============================================================================

/// One value or error from a feed subscription.
pub type FeedItem<T> = Result<T, FeedError>;

/// The abstracted upstream API client.
///
/// Each method opens an independent subscription delivering the most recent
/// state of that source. Implementations decide transport, batching, and
/// retry; composition only requires push delivery and channel closure on
/// teardown.
pub trait ArtifactBackend: Send + Sync + 'static {
    /// Subscribe to the artifact's stream records. Each delivery replaces
    /// the previous full record list.
    fn stream_records(&self, artifact: &ArtifactId) -> mpsc::Receiver<FeedItem<Vec<StreamRecord>>>;

    /// Subscribe to the artifact's tool instance index.
    fn instance_index(&self, artifact: &ArtifactId) -> mpsc::Receiver<FeedItem<InstanceIndex>>;

    /// Subscribe to the artifact's has-content flag.
    fn has_content(&self, artifact: &ArtifactId) -> mpsc::Receiver<FeedItem<bool>>;

    /// Open a fresh query subscription for one on-demand feed. Invoked once
    /// per accepted extend request; duplicate suppression happens above this
    /// trait.
    fn query_events(
        &self,
        artifact: &ArtifactId,
        feed_name: &str,
    ) -> mpsc::Receiver<FeedItem<QueryBatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_displays_snake_case() {
        assert_eq!(SourceKind::HasContent.to_string(), "has_content");
        assert_eq!(
            serde_json::to_string(&SourceKind::Registry).unwrap(),
            "\"registry\""
        );
    }

    #[test]
    fn failure_carries_feed_name() {
        let failure = FeedFailure::from_error(
            SourceKind::Query,
            Some("hits".into()),
            &FeedError::Upstream("timeout".into()),
        );
        assert_eq!(failure.feed.as_deref(), Some("hits"));
        assert!(failure.message.contains("timeout"));
    }
}
