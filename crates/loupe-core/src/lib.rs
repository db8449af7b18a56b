//! loupe-core: reactive pane composition for artifact inspection UIs.
//!
//! This crate aggregates several independently-arriving, asynchronous
//! metadata sources into a stable, de-duplicated, ordered list of renderable
//! panes, while racing against a separate asynchronous process (template
//! slot registration) that is not guaranteed to be ready when the data is.
//!
//! # Architecture
//!
//! ```text
//! Upstream feeds ──► Aggregator ──► Builder ──► tabs / badge
//!                                      ▲
//!                   Template registry ─┘ (gates which items materialize)
//! ```
//!
//! # Modules
//!
//! - `record`: stream records, author metadata, identities
//! - `registry`: template slot snapshots and slot-key derivation
//! - `aggregate`: exclusion rules, author resolution, bucketing
//! - `pane`: pane specifications, the composed view-model unit
//! - `builder`: groups × registry × flags → ordered pane list
//! - `badge`: notable-pane counting
//! - `query`: on-demand query feeds with duplicate suppression
//! - `join`: last-known-value-per-source combination state
//! - `feeds`: the abstracted upstream API client
//! - `composer`: the per-view orchestration task and handle
//! - `config`: composer configuration
//! - `logging`: structured logging setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod badge;
pub mod builder;
pub mod composer;
pub mod config;
pub mod error;
pub mod feeds;
pub mod join;
pub mod logging;
pub mod pane;
pub mod query;
pub mod record;
pub mod registry;

pub use composer::{ComposerHandle, ComposerSnapshot, spawn_composer};
pub use error::{ComposeError, FeedError, Result};
pub use pane::{PaneId, PaneSpec};
pub use record::{ArtifactId, ContentId, StreamRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
