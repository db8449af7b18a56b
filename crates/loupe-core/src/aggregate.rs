//! Source aggregation: normalize raw stream records into ordered pane
//! groups.
//!
//! Runs on every joint emission of the upstream feeds and recomputes the
//! whole grouping from scratch (arena-style: a fresh map per pass, never an
//! in-place patch). Downstream consumers treat the result as replace-in-full.
//!
//! # Rules, in order
//!
//! 1. **Self-reference exclusion**: two independent predicates, OR'd.
//!    A non-textual stream whose content identity equals the owning
//!    artifact's identity is dropped, and so is any stream whose significant
//!    label contains `"content"`. The two conditions are deliberately kept
//!    separate rather than unified.
//! 2. **Author resolution**: the record's first instance identity keys the
//!    instance index. A missing entry is a data defect; the record is
//!    skipped with a warning and aggregation continues.
//! 3. **Category override**: user-category authors collapse into the
//!    synthetic `"user"` bucket (privacy consolidation of human submitters).
//! 4. **Bucketing**: append under the effective author name. Bucket order
//!    and intra-bucket order are arrival order, never sorted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::record::{AuthorMeta, InstanceIndex, StreamRecord};

/// Substring of the significant label that marks a generic content stream.
const CONTENT_LABEL_MARKER: &str = "content";

// =============================================================================
// Output types
// =============================================================================

/// A stream record paired with its resolved author metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedRecord {
    /// The surviving stream record.
    pub record: StreamRecord,
    /// Author metadata resolved through the instance index.
    pub author: AuthorMeta,
}

impl GroupedRecord {
    /// The author name used for grouping, naming, and identity derivation.
    #[must_use]
    pub fn effective_author(&self) -> &str {
        self.author.effective_name()
    }
}

/// Effective author name → records in arrival order.
///
/// Bucket iteration order is first-arrival order of each effective author.
pub type PaneGroups = IndexMap<String, Vec<GroupedRecord>>;

/// Counters from one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Records delivered by the stream feed.
    pub records_seen: usize,
    /// Records dropped as non-textual self-references.
    pub dropped_self_reference: usize,
    /// Records dropped for a `"content"`-marked significant label.
    pub dropped_content_label: usize,
    /// Records deferred because the instance index has not arrived yet.
    pub deferred_no_index: usize,
    /// Records skipped because their instance is unknown to the index.
    pub skipped_unknown_instance: usize,
    /// Records that made it into a bucket.
    pub grouped: usize,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// Fresh grouping, replace-in-full.
    pub groups: PaneGroups,
    /// Pass counters.
    pub stats: AggregateStats,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Whether the exclusion rules drop this record.
fn is_excluded(record: &StreamRecord, stats: &mut AggregateStats) -> bool {
    if !record.is_legacy_text() && record.is_self_reference() {
        stats.dropped_self_reference += 1;
        return true;
    }
    let content_marked = record
        .first_label()
        .is_some_and(|l| l.to_ascii_lowercase().contains(CONTENT_LABEL_MARKER));
    if content_marked {
        stats.dropped_content_label += 1;
        return true;
    }
    false
}

/// Aggregate one joint emission of the stream feed into pane groups.
///
/// `instances` is `None` while the instance feed has not produced its first
/// value; in that state every record defers silently (transient absence, not
/// a defect) and reappears on the next pass once the index arrives.
#[must_use]
pub fn aggregate(records: &[StreamRecord], instances: Option<&InstanceIndex>) -> AggregateOutcome {
    let mut groups = PaneGroups::new();
    let mut stats = AggregateStats {
        records_seen: records.len(),
        ..AggregateStats::default()
    };

    for record in records {
        if is_excluded(record, &mut stats) {
            continue;
        }

        let Some(index) = instances else {
            stats.deferred_no_index += 1;
            debug!(
                artifact = %record.artifact_id,
                content = %record.content_id,
                "instance index not yet available; deferring record"
            );
            continue;
        };

        let author = record.primary_instance().and_then(|id| index.get(id));
        let Some(author) = author else {
            stats.skipped_unknown_instance += 1;
            warn!(
                artifact = %record.artifact_id,
                content = %record.content_id,
                instance = ?record.primary_instance(),
                "author lookup failed for stream record; skipping"
            );
            continue;
        };

        let grouped = GroupedRecord {
            record: record.clone(),
            author: author.clone(),
        };
        let key = grouped.effective_author().to_string();
        groups.entry(key).or_default().push(grouped);
        stats.grouped += 1;
    }

    AggregateOutcome { groups, stats }
}
