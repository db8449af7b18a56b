//! Pane building: combine aggregated groups with the current registry
//! snapshot into the ordered pane list.
//!
//! The build is a pure function of its inputs and runs in full on every
//! recompute. Output ordering is stable across rebuilds as long as upstream
//! bucket/record order is stable, and pane identities are deterministic, so
//! keyed consumers never thrash.
//!
//! A record whose slot has no placeholder yet is *silently excluded from
//! this pass*; it reappears once the registry snapshot updates and the
//! builder reruns. That omission is the designed mechanism for surviving the
//! data/template race, not an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::PaneGroups;
use crate::config::LabelConfig;
use crate::pane::{PaneId, PaneSpec};
use crate::query::QueryFeeds;
use crate::record::ArtifactId;
use crate::registry::{
    BYTES_SLOT, RegistrySnapshot, SEARCH_SLOT, query_slot_key, stream_slot_key,
};

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Everything one build pass reads.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Artifact the list is composed for.
    pub artifact: &'a ArtifactId,
    /// Aggregated pane groups, bucket order significant.
    pub groups: &'a PaneGroups,
    /// Current template registry snapshot.
    pub registry: &'a RegistrySnapshot,
    /// Whether the artifact has a raw byte payload.
    pub has_content: bool,
    /// Live on-demand query feeds.
    pub queries: &'a QueryFeeds,
    /// Display labels.
    pub labels: &'a LabelConfig,
}

/// Counters from one build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Stream panes emitted.
    pub stream_panes: usize,
    /// Records deferred because their slot has no placeholder yet.
    pub deferred_no_slot: usize,
    /// Query panes emitted.
    pub query_panes: usize,
    /// Whether the fixed byte/search panes were appended.
    pub fixed_appended: bool,
    /// Panes counting toward the badge.
    pub notable: usize,
}

/// Result of one build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    /// Ordered pane list, replace-in-full.
    pub panes: Vec<PaneSpec>,
    /// Pass counters.
    pub stats: BuildStats,
}

// =============================================================================
// Naming
// =============================================================================

/// Display name for an unpromoted stream pane: significant label plus author,
/// with a version suffix when the author carries one.
fn stream_display_name(label: Option<&str>, author: &str, version: &str) -> String {
    let mut name = match label {
        Some(l) if !l.is_empty() => format!("{l} ({author})"),
        _ => author.to_string(),
    };
    if !version.is_empty() {
        name.push_str(&format!(" v{version}"));
    }
    name
}

/// Display name for a query pane; reads `"<name> (0 documents)"` until the
/// feed's first payload arrives.
fn query_display_name(name: &str, total_docs: u64) -> String {
    format!("{name} ({total_docs} documents)")
}

// =============================================================================
// Build
// =============================================================================

/// Build the ordered pane list for one recompute pass.
#[must_use]
pub fn build(ctx: &BuildContext<'_>) -> BuildOutcome {
    let mut panes = Vec::new();
    let mut stats = BuildStats::default();
    let mut found_default = false;

    // 1. Stream panes: flatten buckets in arrival order, gate on placeholder
    //    availability, then apply display-name promotion.
    for (author_key, bucket) in ctx.groups {
        for grouped in bucket {
            let record = &grouped.record;
            let version = &grouped.author.version;
            let slot_key = stream_slot_key(author_key, &record.content_id, version);

            let Some(handle) = ctx.registry.resolve(&slot_key) else {
                stats.deferred_no_slot += 1;
                debug!(
                    artifact = %ctx.artifact,
                    slot = %slot_key,
                    "placeholder not mounted; deferring pane until next snapshot"
                );
                continue;
            };

            let (display_name, preferred_slot) =
                if record.is_self_reference() && record.is_legacy_text() {
                    found_default = true;
                    (ctx.labels.preview.clone(), Some(0))
                } else if record.first_label() == Some(ctx.labels.rendered_image_marker.as_str()) {
                    found_default = true;
                    (ctx.labels.rendered_image.clone(), Some(0))
                } else {
                    (
                        stream_display_name(record.first_label(), author_key, version),
                        None,
                    )
                };

            panes.push(PaneSpec {
                identity: PaneId::for_stream(author_key, &record.content_id, version),
                display_name,
                notable: true,
                preferred_slot,
                placeholder: Some(handle),
                artifact_id: ctx.artifact.clone(),
                content_id: Some(record.content_id.clone()),
            });
            stats.stream_panes += 1;
        }
    }

    // 2. Query panes: always present once registered, placeholder optional.
    for (name, state) in ctx.queries.iter() {
        panes.push(PaneSpec {
            identity: PaneId::for_query(name),
            display_name: query_display_name(name, state.total_docs()),
            notable: true,
            preferred_slot: None,
            placeholder: ctx.registry.resolve(&query_slot_key(name)),
            artifact_id: ctx.artifact.clone(),
            content_id: None,
        });
        stats.query_panes += 1;
    }

    // 3. Fixed system panes, only when the artifact has a raw payload. The
    //    byte view outranks the search view for claiming the default slot.
    if ctx.has_content {
        let (bytes_slot, search_slot) = if found_default {
            (None, None)
        } else {
            (Some(0), Some(1))
        };
        panes.push(PaneSpec {
            identity: PaneId::bytes(),
            display_name: ctx.labels.bytes.clone(),
            notable: false,
            preferred_slot: bytes_slot,
            placeholder: ctx.registry.resolve(BYTES_SLOT),
            artifact_id: ctx.artifact.clone(),
            content_id: None,
        });
        panes.push(PaneSpec {
            identity: PaneId::search(),
            display_name: ctx.labels.search.clone(),
            notable: false,
            preferred_slot: search_slot,
            placeholder: ctx.registry.resolve(SEARCH_SLOT),
            artifact_id: ctx.artifact.clone(),
            content_id: None,
        });
        stats.fixed_appended = true;
    } else {
        info!(artifact = %ctx.artifact, "artifact has no raw payload; fixed panes omitted");
    }

    stats.notable = panes.iter().filter(|p| p.notable).count();
    BuildOutcome { panes, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{GroupedRecord, PaneGroups};
    use crate::record::{AuthorMeta, ContentId, StreamRecord};
    use crate::registry::{SlotEntry, SlotHandle};

    fn grouped(
        author: &str,
        version: &str,
        legacy_kind: &str,
        content: &str,
        labels: &[&str],
    ) -> GroupedRecord {
        GroupedRecord {
            record: StreamRecord {
                tool_name: author.into(),
                tool_version: version.into(),
                tool_category: "analysis".into(),
                legacy_kind: legacy_kind.into(),
                kind: None,
                labels: labels.iter().map(|s| (*s).to_string()).collect(),
                language: None,
                size_bytes: 16,
                artifact_id: "owner".into(),
                content_id: content.into(),
                instance_ids: vec![format!("inst-{author}")],
            },
            author: AuthorMeta {
                name: author.into(),
                version: version.into(),
                category: "Analysis".into(),
            },
        }
    }

    fn groups_of(records: Vec<GroupedRecord>) -> PaneGroups {
        let mut groups = PaneGroups::new();
        for g in records {
            let key = g.effective_author().to_string();
            groups.entry(key).or_default().push(g);
        }
        groups
    }

    fn full_registry(groups: &PaneGroups) -> RegistrySnapshot {
        let mut entries = Vec::new();
        let mut next = 1;
        for (author, bucket) in groups {
            for g in bucket {
                entries.push(SlotEntry {
                    name: stream_slot_key(author, &g.record.content_id, &g.author.version),
                    placeholder: SlotHandle(next),
                });
                next += 1;
            }
        }
        entries.push(SlotEntry {
            name: BYTES_SLOT.into(),
            placeholder: SlotHandle(next),
        });
        entries.push(SlotEntry {
            name: SEARCH_SLOT.into(),
            placeholder: SlotHandle(next + 1),
        });
        RegistrySnapshot::from_entries(entries)
    }

    fn ctx<'a>(
        artifact: &'a ArtifactId,
        groups: &'a PaneGroups,
        registry: &'a RegistrySnapshot,
        has_content: bool,
        queries: &'a QueryFeeds,
        labels: &'a LabelConfig,
    ) -> BuildContext<'a> {
        BuildContext {
            artifact,
            groups,
            registry,
            has_content,
            queries,
            labels,
        }
    }

    #[test]
    fn preview_pane_claims_slot_zero_and_fixed_panes_yield() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped("preview", "1", "text", "owner", &["body"])]);
        let registry = full_registry(&groups);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, true, &queries, &labels));

        let preview = &out.panes[0];
        assert_eq!(preview.display_name, "Preview");
        assert_eq!(preview.preferred_slot, Some(0));
        assert!(preview.notable);

        let bytes = out
            .panes
            .iter()
            .find(|p| p.identity == PaneId::bytes())
            .unwrap();
        let search = out
            .panes
            .iter()
            .find(|p| p.identity == PaneId::search())
            .unwrap();
        assert_eq!(bytes.preferred_slot, None);
        assert_eq!(search.preferred_slot, None);
        assert!(!bytes.notable);
        assert!(!search.notable);
    }

    #[test]
    fn fixed_panes_claim_slots_when_no_default_found() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped("strings", "3", "text", "h2", &["ascii"])]);
        let registry = full_registry(&groups);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, true, &queries, &labels));

        let bytes = out
            .panes
            .iter()
            .find(|p| p.identity == PaneId::bytes())
            .unwrap();
        let search = out
            .panes
            .iter()
            .find(|p| p.identity == PaneId::search())
            .unwrap();
        assert_eq!(bytes.preferred_slot, Some(0));
        assert_eq!(search.preferred_slot, Some(1));
    }

    #[test]
    fn rendered_image_marker_promotes_pane() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped(
            "render",
            "2",
            "binary",
            "h7",
            &["rendered-image"],
        )]);
        let registry = full_registry(&groups);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, true, &queries, &labels));

        assert_eq!(out.panes[0].display_name, "Rendered image");
        assert_eq!(out.panes[0].preferred_slot, Some(0));
        // Promotion found a default, so fixed panes claim nothing.
        assert!(out.panes.iter().all(|p| {
            p.identity != PaneId::bytes() || p.preferred_slot.is_none()
        }));
    }

    #[test]
    fn unresolved_slot_defers_pane_silently() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped("strings", "3", "text", "h2", &["ascii"])]);
        let registry = RegistrySnapshot::new();
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, false, &queries, &labels));

        assert!(out.panes.is_empty());
        assert_eq!(out.stats.deferred_no_slot, 1);
        assert!(!out.stats.fixed_appended);
    }

    #[test]
    fn display_name_includes_label_author_and_version() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped("strings", "3", "text", "h2", &["ascii"])]);
        let registry = full_registry(&groups);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, false, &queries, &labels));

        assert_eq!(out.panes[0].display_name, "ascii (strings) v3");
    }

    #[test]
    fn empty_version_omits_suffix() {
        assert_eq!(stream_display_name(Some("notes"), "user", ""), "notes (user)");
        assert_eq!(stream_display_name(None, "user", ""), "user");
    }

    #[test]
    fn query_pane_defaults_to_zero_documents() {
        let artifact = ArtifactId::from("owner");
        let groups = PaneGroups::new();
        let registry = RegistrySnapshot::new();
        let mut queries = QueryFeeds::new();
        queries.register("hits");
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, false, &queries, &labels));

        assert_eq!(out.panes.len(), 1);
        assert_eq!(out.panes[0].display_name, "hits (0 documents)");
        assert_eq!(out.panes[0].identity, PaneId::for_query("hits"));
        assert!(out.panes[0].notable);
        assert!(out.panes[0].placeholder.is_none());
    }

    #[test]
    fn identity_and_name_survive_registry_growth() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![
            grouped("strings", "3", "text", "h2", &["ascii"]),
            grouped("hash", "1", "text", "h3", &["digest"]),
        ]);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();

        // First pass: only the strings slot is mounted.
        let partial = RegistrySnapshot::from_entries(vec![SlotEntry {
            name: stream_slot_key("strings", &ContentId::from("h2"), "3"),
            placeholder: SlotHandle(1),
        }]);
        let first = build(&ctx(&artifact, &groups, &partial, false, &queries, &labels));
        assert_eq!(first.panes.len(), 1);

        // Second pass: every slot is mounted; data unchanged.
        let full = full_registry(&groups);
        let second = build(&ctx(&artifact, &groups, &full, false, &queries, &labels));
        assert_eq!(second.panes.len(), 2);

        let surviving = &second.panes[0];
        assert_eq!(surviving.identity, first.panes[0].identity);
        assert_eq!(surviving.display_name, first.panes[0].display_name);
    }

    #[test]
    fn notable_counts_exclude_fixed_panes() {
        let artifact = ArtifactId::from("owner");
        let groups = groups_of(vec![grouped("strings", "3", "text", "h2", &["ascii"])]);
        let registry = full_registry(&groups);
        let queries = QueryFeeds::new();
        let labels = LabelConfig::default();
        let out = build(&ctx(&artifact, &groups, &registry, true, &queries, &labels));

        assert_eq!(out.panes.len(), 3);
        assert_eq!(out.stats.notable, 1);
    }
}
