//! The joint-latest join: last-known-value-per-source combination state.
//!
//! The composer recomputes whenever ANY source produces a new value, using
//! the most recent value of every other source. A source that has not yet
//! emitted is held as absent, and absence flows through composition as
//! omission, never as an error. There is no guaranteed delivery order across
//! independent sources; the template snapshot may arrive before or after the
//! data, and recomputation must be idempotent either way.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateStats, aggregate};
use crate::builder::{BuildContext, BuildStats, build};
use crate::config::LabelConfig;
use crate::feeds::FeedFailure;
use crate::pane::PaneSpec;
use crate::query::{QueryBatch, QueryFeeds};
use crate::record::{ArtifactId, InstanceIndex, StreamRecord};
use crate::registry::RegistrySnapshot;

// =============================================================================
// Events
// =============================================================================

/// One delivery from any upstream source, merged onto a single channel.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// Full replacement of the artifact's stream records.
    Streams(Vec<StreamRecord>),
    /// Full replacement of the instance index.
    Instances(InstanceIndex),
    /// The has-content flag.
    HasContent(bool),
    /// Full replacement of the template registry snapshot.
    Registry(RegistrySnapshot),
    /// A payload for one live query feed.
    Query {
        /// Feed name.
        feed: String,
        /// The payload.
        batch: QueryBatch,
    },
    /// An upstream source failed; latest values stay in effect.
    Failed(FeedFailure),
}

// =============================================================================
// Join state
// =============================================================================

/// Latest value per source, plus the live query feed set.
#[derive(Debug)]
pub struct JoinState {
    artifact: ArtifactId,
    streams: Option<Vec<StreamRecord>>,
    instances: Option<InstanceIndex>,
    has_content: Option<bool>,
    registry: RegistrySnapshot,
    registry_seen: bool,
    queries: QueryFeeds,
}

/// Counters and timing from one full recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RebuildStats {
    /// Aggregation pass counters.
    pub aggregate: AggregateStats,
    /// Build pass counters.
    pub build: BuildStats,
    /// Wall-clock recompute time.
    pub elapsed: Duration,
}

/// Result of one full recompute.
#[derive(Debug, Clone, Default)]
pub struct Rebuild {
    /// The ordered pane list.
    pub panes: Vec<PaneSpec>,
    /// Recompute counters.
    pub stats: RebuildStats,
}

impl JoinState {
    /// Fresh join state for one artifact; every source starts absent.
    #[must_use]
    pub fn new(artifact: ArtifactId) -> Self {
        Self {
            artifact,
            streams: None,
            instances: None,
            has_content: None,
            registry: RegistrySnapshot::new(),
            registry_seen: false,
            queries: QueryFeeds::new(),
        }
    }

    /// Apply one source event.
    ///
    /// Value events replace that source's latest value and return `None`;
    /// failure events leave every latest value untouched and hand the
    /// failure back for surfacing.
    pub fn apply(&mut self, event: SourceEvent) -> Option<FeedFailure> {
        match event {
            SourceEvent::Streams(records) => self.streams = Some(records),
            SourceEvent::Instances(index) => self.instances = Some(index),
            SourceEvent::HasContent(flag) => self.has_content = Some(flag),
            SourceEvent::Registry(snapshot) => {
                self.registry = snapshot;
                self.registry_seen = true;
            }
            SourceEvent::Query { feed, batch } => self.queries.apply_batch(&feed, batch),
            SourceEvent::Failed(failure) => return Some(failure),
        }
        None
    }

    /// Register a query feed; `false` when the name is already live.
    pub fn register_query(&mut self, name: &str) -> bool {
        self.queries.register(name)
    }

    /// Recompute the pane list from the latest values of every source.
    ///
    /// Pure and side-effect-free: calling twice with unchanged state yields
    /// the same list, pane for pane.
    #[must_use]
    pub fn recompute(&self, labels: &LabelConfig) -> Rebuild {
        let start = Instant::now();

        let records: &[StreamRecord] = self.streams.as_deref().unwrap_or(&[]);
        let outcome = aggregate(records, self.instances.as_ref());

        let ctx = BuildContext {
            artifact: &self.artifact,
            groups: &outcome.groups,
            registry: &self.registry,
            has_content: self.has_content.unwrap_or(false),
            queries: &self.queries,
            labels,
        };
        let built = build(&ctx);

        Rebuild {
            panes: built.panes,
            stats: RebuildStats {
                aggregate: outcome.stats,
                build: built.stats,
                elapsed: start.elapsed(),
            },
        }
    }

    /// Artifact this state serves.
    #[must_use]
    pub fn artifact(&self) -> &ArtifactId {
        &self.artifact
    }

    /// Whether the stream feed has emitted.
    #[must_use]
    pub fn streams_arrived(&self) -> bool {
        self.streams.is_some()
    }

    /// Whether the instance feed has emitted.
    #[must_use]
    pub fn instances_arrived(&self) -> bool {
        self.instances.is_some()
    }

    /// Whether the registry snapshot has arrived.
    #[must_use]
    pub fn registry_arrived(&self) -> bool {
        self.registry_seen
    }

    /// Latest has-content flag, if it arrived.
    #[must_use]
    pub fn has_content(&self) -> Option<bool> {
        self.has_content
    }

    /// Names of live query feeds, in registration order.
    #[must_use]
    pub fn query_names(&self) -> Vec<String> {
        self.queries.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuthorMeta;
    use crate::registry::{SlotEntry, SlotHandle, stream_slot_key};

    fn record(author: &str, content: &str) -> StreamRecord {
        StreamRecord {
            tool_name: author.into(),
            tool_version: "1".into(),
            tool_category: "analysis".into(),
            legacy_kind: "text".into(),
            kind: None,
            labels: vec!["out".into()],
            language: None,
            size_bytes: 4,
            artifact_id: "owner".into(),
            content_id: content.into(),
            instance_ids: vec![format!("inst-{author}")],
        }
    }

    fn index() -> InstanceIndex {
        let mut idx = InstanceIndex::new();
        idx.insert(
            "inst-strings".into(),
            AuthorMeta {
                name: "strings".into(),
                version: "1".into(),
                category: "Analysis".into(),
            },
        );
        idx
    }

    fn registry() -> RegistrySnapshot {
        RegistrySnapshot::from_entries(vec![SlotEntry {
            name: stream_slot_key("strings", &"h2".into(), "1"),
            placeholder: SlotHandle(9),
        }])
    }

    #[test]
    fn data_before_registry_converges_with_registry_before_data() {
        let labels = LabelConfig::default();

        let mut a = JoinState::new("owner".into());
        a.apply(SourceEvent::Streams(vec![record("strings", "h2")]));
        a.apply(SourceEvent::Instances(index()));
        assert!(a.recompute(&labels).panes.is_empty());
        a.apply(SourceEvent::Registry(registry()));
        let a_panes = a.recompute(&labels).panes;

        let mut b = JoinState::new("owner".into());
        b.apply(SourceEvent::Registry(registry()));
        assert!(b.recompute(&labels).panes.is_empty());
        b.apply(SourceEvent::Instances(index()));
        b.apply(SourceEvent::Streams(vec![record("strings", "h2")]));
        let b_panes = b.recompute(&labels).panes;

        assert_eq!(a_panes, b_panes);
        assert_eq!(a_panes.len(), 1);
    }

    #[test]
    fn recompute_is_idempotent() {
        let labels = LabelConfig::default();
        let mut state = JoinState::new("owner".into());
        state.apply(SourceEvent::Streams(vec![record("strings", "h2")]));
        state.apply(SourceEvent::Instances(index()));
        state.apply(SourceEvent::Registry(registry()));
        state.apply(SourceEvent::HasContent(true));

        let first = state.recompute(&labels);
        let second = state.recompute(&labels);
        assert_eq!(first.panes, second.panes);
    }

    #[test]
    fn failure_leaves_latest_values_untouched() {
        let labels = LabelConfig::default();
        let mut state = JoinState::new("owner".into());
        state.apply(SourceEvent::Streams(vec![record("strings", "h2")]));
        state.apply(SourceEvent::Instances(index()));
        state.apply(SourceEvent::Registry(registry()));
        let before = state.recompute(&labels).panes;

        let failure = state.apply(SourceEvent::Failed(FeedFailure {
            source: crate::feeds::SourceKind::Streams,
            feed: None,
            message: "connection reset".into(),
        }));
        assert!(failure.is_some());
        assert_eq!(state.recompute(&labels).panes, before);
    }

    #[test]
    fn query_batch_for_unregistered_feed_is_ignored() {
        let labels = LabelConfig::default();
        let mut state = JoinState::new("owner".into());
        state.apply(SourceEvent::Query {
            feed: "ghost".into(),
            batch: QueryBatch::default(),
        });
        assert!(state.recompute(&labels).panes.is_empty());
        assert!(state.query_names().is_empty());
    }
}
