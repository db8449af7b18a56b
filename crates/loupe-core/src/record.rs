//! Stream records and author metadata: the raw units of aggregable content.
//!
//! A [`StreamRecord`] describes one data stream attached to an artifact under
//! inspection: who produced it (tool name/version/category), what it contains
//! (legacy kind, optional refined kind, labels, language), and the two
//! identities that drive composition: the owning artifact's identity and the
//! stream's own content identity.
//!
//! Records are transient computation state: they are re-delivered in full by
//! the upstream feed on every emission and never persisted here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Identities
// =============================================================================

/// Stable identity of an artifact for the lifetime of an inspection session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Globally unique identity of one stream's byte payload.
///
/// Two streams with the same `ContentId` carry identical bytes; a stream whose
/// content identity equals its owner's [`ArtifactId`] is the raw artifact
/// itself (the "self-reference" case the aggregator filters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub String);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Stream record
// =============================================================================

/// The legacy content kind marker for textual streams.
pub const LEGACY_KIND_TEXT: &str = "text";

/// One unit of aggregable content delivered by the stream feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Producing tool's name as reported by the upstream feed.
    pub tool_name: String,
    /// Producing tool's version string (may be empty).
    pub tool_version: String,
    /// Producing tool's category as reported by the upstream feed.
    pub tool_category: String,
    /// Legacy content kind, e.g. `"text"` or `"binary"`.
    pub legacy_kind: String,
    /// Refined content kind when the upstream has one.
    pub kind: Option<String>,
    /// Ordered labels; the first element is the significant one.
    pub labels: Vec<String>,
    /// Language tag, when known.
    pub language: Option<String>,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Identity of the artifact this stream belongs to.
    pub artifact_id: ArtifactId,
    /// Identity of this stream's byte payload.
    pub content_id: ContentId,
    /// Identities of the tool instances associated with this record; the
    /// first one keys author resolution in the instance index.
    pub instance_ids: Vec<String>,
}

impl StreamRecord {
    /// Whether the legacy kind marks this stream as textual.
    #[must_use]
    pub fn is_legacy_text(&self) -> bool {
        self.legacy_kind.eq_ignore_ascii_case(LEGACY_KIND_TEXT)
    }

    /// The significant (first) label, if any.
    #[must_use]
    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// The instance identity that keys author resolution.
    #[must_use]
    pub fn primary_instance(&self) -> Option<&str> {
        self.instance_ids.first().map(String::as_str)
    }

    /// Whether this stream's payload is the owning artifact itself.
    #[must_use]
    pub fn is_self_reference(&self) -> bool {
        self.content_id.0 == self.artifact_id.0
    }
}

// =============================================================================
// Author metadata
// =============================================================================

/// The tool category that triggers the synthetic `"user"` bucket merge.
pub const USER_CATEGORY: &str = "user";

/// Author metadata resolved through the instance index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorMeta {
    /// Author display name.
    pub name: String,
    /// Author version string (may be empty).
    pub version: String,
    /// Author category; `"user"` (any case) marks human submitters.
    pub category: String,
}

impl AuthorMeta {
    /// Whether this author falls in the consolidated human-submitter bucket.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.category.eq_ignore_ascii_case(USER_CATEGORY)
    }

    /// The author name used for grouping, naming, and identity derivation.
    ///
    /// All user-category authors collapse to the literal `"user"` regardless
    /// of their reported name; every other author keeps its resolved name.
    #[must_use]
    pub fn effective_name(&self) -> &str {
        if self.is_user() {
            USER_CATEGORY
        } else {
            &self.name
        }
    }
}

/// Instance identity → author metadata, delivered by the instance feed.
pub type InstanceIndex = HashMap<String, AuthorMeta>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(legacy_kind: &str, artifact: &str, content: &str) -> StreamRecord {
        StreamRecord {
            tool_name: "strings".into(),
            tool_version: "1.2".into(),
            tool_category: "analysis".into(),
            legacy_kind: legacy_kind.into(),
            kind: None,
            labels: vec!["ascii-strings".into()],
            language: None,
            size_bytes: 128,
            artifact_id: ArtifactId::from(artifact),
            content_id: ContentId::from(content),
            instance_ids: vec!["inst-1".into()],
        }
    }

    #[test]
    fn legacy_text_is_case_insensitive() {
        assert!(record("TEXT", "a", "b").is_legacy_text());
        assert!(record("text", "a", "b").is_legacy_text());
        assert!(!record("binary", "a", "b").is_legacy_text());
    }

    #[test]
    fn self_reference_compares_content_to_owner() {
        assert!(record("binary", "h1", "h1").is_self_reference());
        assert!(!record("binary", "h1", "h2").is_self_reference());
    }

    #[test]
    fn effective_name_collapses_user_category() {
        let alice = AuthorMeta {
            name: "alice".into(),
            version: "".into(),
            category: "User".into(),
        };
        let plugin = AuthorMeta {
            name: "strings".into(),
            version: "1.2".into(),
            category: "Analysis".into(),
        };
        assert_eq!(alice.effective_name(), "user");
        assert_eq!(plugin.effective_name(), "strings");
    }

    #[test]
    fn record_serializes_roundtrip() {
        let rec = record("text", "h1", "h1");
        let json = serde_json::to_string(&rec).unwrap();
        let back: StreamRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
