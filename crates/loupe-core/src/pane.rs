//! Pane specifications: the externally visible unit of UI composition.
//!
//! A [`PaneSpec`] is a pure view-model entry: identity for keyed rendering,
//! display name, badge eligibility, optional preferred visual slot, and an
//! optional resolved placeholder. The list of specs is rebuilt in full on
//! every relevant upstream change, but identities stay stable so keyed
//! consumers do not thrash.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::{ArtifactId, ContentId};
use crate::registry::SlotHandle;

// =============================================================================
// Identity
// =============================================================================

/// Identity of the byte-level system pane.
pub const BYTES_PANE_ID: &str = "artifact-bytes";

/// Identity of the textual-search system pane.
pub const SEARCH_PANE_ID: &str = "artifact-search";

/// Stable pane identity, unique within one composed list.
///
/// Not globally unique across artifacts; the same content stream never
/// appears twice for one artifact in one list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneId(pub String);

impl PaneId {
    /// Identity for a stream-derived pane.
    #[must_use]
    pub fn for_stream(author: &str, content: &ContentId, version: &str) -> Self {
        Self(format!("{author}-{content}-{version}"))
    }

    /// Identity for an on-demand query pane.
    #[must_use]
    pub fn for_query(feed_name: &str) -> Self {
        Self(format!("query-{feed_name}"))
    }

    /// Identity for the byte-level system pane.
    #[must_use]
    pub fn bytes() -> Self {
        Self(BYTES_PANE_ID.to_string())
    }

    /// Identity for the textual-search system pane.
    #[must_use]
    pub fn search() -> Self {
        Self(SEARCH_PANE_ID.to_string())
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Pane specification
// =============================================================================

/// One selectable content view within the composed panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSpec {
    /// Stable key for keyed rendering.
    pub identity: PaneId,
    /// Human-facing pane title.
    pub display_name: String,
    /// Whether this pane counts toward the badge (the sole badge input).
    pub notable: bool,
    /// Preferred visual slot to open in by default, when claimed.
    pub preferred_slot: Option<usize>,
    /// Resolved placeholder handle; absent while the slot is unmounted.
    pub placeholder: Option<SlotHandle>,
    /// Artifact this pane was composed for.
    pub artifact_id: ArtifactId,
    /// Content identity backing this pane, for stream-derived panes.
    pub content_id: Option<ContentId>,
}
