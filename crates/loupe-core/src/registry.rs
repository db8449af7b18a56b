//! Template registry snapshots: which named slots currently have a
//! renderable placeholder.
//!
//! Placeholder availability is driven by the rendering layer and changes
//! asynchronously and independently of data. The registry therefore arrives
//! here as a push stream of full snapshots, and the builder re-runs on every
//! snapshot change, not only on data changes: an item whose data arrived
//! earlier may have no placeholder yet.
//!
//! Resolution failure is not an error. Absence is a normal transient state
//! that omits or defers the pane until the next snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::record::ContentId;

// =============================================================================
// Handles
// =============================================================================

/// Opaque reference to a renderable slot, independent of the data it will
/// eventually display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotHandle(pub u64);

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

/// One entry in a registry snapshot as delivered by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Slot name the placeholder was registered under.
    pub name: String,
    /// The placeholder handle.
    pub placeholder: SlotHandle,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of every slot that currently has a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    entries: HashMap<String, SlotHandle>,
}

impl RegistrySnapshot {
    /// An empty snapshot (nothing mounted yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from the rendering layer's entry list. Later entries
    /// win on duplicate names.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = SlotEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.name, e.placeholder))
                .collect(),
        }
    }

    /// Resolve a slot name to its placeholder, if currently mounted.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<SlotHandle> {
        self.entries.get(name).copied()
    }

    /// Number of mounted slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no slots are mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Slot keys
// =============================================================================

/// Slot name under which a stream pane's placeholder is registered.
///
/// Deterministic over the effective author name, content identity, and
/// author version, so a re-derived key always lands on the same slot.
#[must_use]
pub fn stream_slot_key(author: &str, content: &ContentId, version: &str) -> String {
    format!("stream-{author}-{content}-{version}")
}

/// Slot name for an on-demand query pane.
#[must_use]
pub fn query_slot_key(feed_name: &str) -> String {
    format!("query-{feed_name}")
}

/// Reserved slot name for the byte-level system pane.
pub const BYTES_SLOT: &str = "artifact-bytes";

/// Reserved slot name for the textual-search system pane.
pub const SEARCH_SLOT: &str = "artifact-search";
