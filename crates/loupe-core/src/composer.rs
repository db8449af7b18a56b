//! The composer task: one owner per view for the whole composition state.
//!
//! [`spawn_composer`] wires a set of upstream subscriptions into a single
//! event channel, runs the joint-latest recompute loop on one task, and
//! publishes outputs over `watch` channels:
//!
//! - `tabs`: the ordered pane list, replace-in-full on each emission
//! - `badge`: the notable-pane count, emitted only when it changes
//! - `failure`: the most recent upstream failure, panes left intact
//!
//! ```text
//! streams ──┐
//! instances ─┤ forwarders                      ┌──► tabs (watch)
//! content  ──┼──────────► SourceEvent ─► join ─┼──► badge (watch)
//! registry ──┤              channel    recompute└──► failure (watch)
//! queries  ──┘   ▲
//!                └── extend() registers a feed and spawns its forwarder
//! ```
//!
//! All recomputation is synchronous within the event turn that delivers an
//! emission; firing twice with the same logical inputs yields the same list.
//! Dropping the handle aborts every subscription; in-flight deliveries after
//! teardown are dropped silently, never logged or panicking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::badge::{BadgeTracker, notable_count};
use crate::config::ComposerConfig;
use crate::error::{ComposeError, Result};
use crate::feeds::{ArtifactBackend, FeedFailure, FeedItem, SourceKind};
use crate::join::{JoinState, SourceEvent};
use crate::pane::PaneSpec;
use crate::record::ArtifactId;
use crate::registry::RegistrySnapshot;

// =============================================================================
// Commands
// =============================================================================

enum Command {
    Extend {
        names: Vec<String>,
    },
    Snapshot {
        reply: oneshot::Sender<ComposerSnapshot>,
    },
    Shutdown,
}

/// Serializable view of the composer's internal state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerSnapshot {
    /// Artifact being composed.
    pub artifact: String,
    /// Whether the stream feed has emitted.
    pub streams_arrived: bool,
    /// Whether the instance feed has emitted.
    pub instances_arrived: bool,
    /// Whether the registry snapshot has arrived.
    pub registry_arrived: bool,
    /// Latest has-content flag, if it arrived.
    pub has_content: Option<bool>,
    /// Live query feed names, in registration order.
    pub query_feeds: Vec<String>,
    /// Identities of the currently composed panes, in order.
    pub pane_identities: Vec<String>,
    /// Current notable-pane count.
    pub badge: usize,
    /// Number of recomputes performed so far.
    pub rebuilds: u64,
}

// =============================================================================
// Handle
// =============================================================================

/// Owning handle for one composer. Dropping it tears everything down.
pub struct ComposerHandle {
    tabs: watch::Receiver<Vec<PaneSpec>>,
    badge: watch::Receiver<usize>,
    failure: watch::Receiver<Option<FeedFailure>>,
    commands: mpsc::Sender<Command>,
    task: Option<JoinHandle<()>>,
}

impl ComposerHandle {
    /// Subscribe to the composed pane list.
    #[must_use]
    pub fn tabs(&self) -> watch::Receiver<Vec<PaneSpec>> {
        self.tabs.clone()
    }

    /// Subscribe to the notable-pane badge count.
    #[must_use]
    pub fn badge(&self) -> watch::Receiver<usize> {
        self.badge.clone()
    }

    /// Subscribe to the most recent upstream failure.
    #[must_use]
    pub fn failure(&self) -> watch::Receiver<Option<FeedFailure>> {
        self.failure.clone()
    }

    /// Append query feeds for each requested name not already live.
    ///
    /// Names already present are suppressed without a new subscription or
    /// network call; suppression is keyed purely on name equality.
    pub async fn extend(&self, names: Vec<String>) -> Result<()> {
        self.commands
            .send(Command::Extend { names })
            .await
            .map_err(|_| ComposeError::Disposed)
    }

    /// Fetch a diagnostic snapshot of the composer's state.
    pub async fn snapshot(&self) -> Result<ComposerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| ComposeError::Disposed)?;
        rx.await.map_err(|_| ComposeError::Disposed)
    }

    /// Graceful teardown: stop the loop, abort all subscriptions, and wait
    /// for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ComposerHandle {
    fn drop(&mut self) {
        // Dispose-by-drop: abort the composer task; its forwarder set drops
        // with it, cancelling every live subscription.
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

// =============================================================================
// Spawning
// =============================================================================

/// Spawn a composer for one artifact.
///
/// `registry` is the rendering layer's availability stream: a full snapshot
/// per change. Must be called within a tokio runtime.
#[must_use]
pub fn spawn_composer(
    backend: Arc<dyn ArtifactBackend>,
    artifact: ArtifactId,
    registry: mpsc::Receiver<RegistrySnapshot>,
    config: ComposerConfig,
) -> ComposerHandle {
    let (event_tx, event_rx) = mpsc::channel(config.channels.event_capacity);
    let (command_tx, command_rx) = mpsc::channel(config.channels.command_capacity);
    let (tabs_tx, tabs_rx) = watch::channel(Vec::new());
    let (badge_tx, badge_rx) = watch::channel(0usize);
    let (failure_tx, failure_rx) = watch::channel(None);

    let task = tokio::spawn(run(
        backend,
        artifact,
        registry,
        config,
        event_tx,
        event_rx,
        command_rx,
        tabs_tx,
        badge_tx,
        failure_tx,
    ));

    ComposerHandle {
        tabs: tabs_rx,
        badge: badge_rx,
        failure: failure_rx,
        commands: command_tx,
        task: Some(task),
    }
}

// =============================================================================
// The loop
// =============================================================================

#[allow(clippy::too_many_arguments)]
async fn run(
    backend: Arc<dyn ArtifactBackend>,
    artifact: ArtifactId,
    registry: mpsc::Receiver<RegistrySnapshot>,
    config: ComposerConfig,
    event_tx: mpsc::Sender<SourceEvent>,
    mut events: mpsc::Receiver<SourceEvent>,
    mut commands: mpsc::Receiver<Command>,
    tabs_tx: watch::Sender<Vec<PaneSpec>>,
    badge_tx: watch::Sender<usize>,
    failure_tx: watch::Sender<Option<FeedFailure>>,
) {
    let mut state = JoinState::new(artifact.clone());
    let mut badge = BadgeTracker::new();
    let mut panes: Vec<PaneSpec> = Vec::new();
    let mut rebuilds: u64 = 0;

    let mut forwarders = JoinSet::new();
    forwarders.spawn(forward_feed(
        SourceKind::Streams,
        None,
        backend.stream_records(&artifact),
        event_tx.clone(),
        SourceEvent::Streams,
    ));
    forwarders.spawn(forward_feed(
        SourceKind::Instances,
        None,
        backend.instance_index(&artifact),
        event_tx.clone(),
        SourceEvent::Instances,
    ));
    forwarders.spawn(forward_feed(
        SourceKind::HasContent,
        None,
        backend.has_content(&artifact),
        event_tx.clone(),
        SourceEvent::HasContent,
    ));
    forwarders.spawn(forward_registry(registry, event_tx.clone()));

    info!(artifact = %artifact, "composer started");

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                None | Some(Command::Shutdown) => break,
                Some(Command::Snapshot { reply }) => {
                    let _ = reply.send(make_snapshot(&state, &panes, rebuilds));
                }
                Some(Command::Extend { names }) => {
                    let mut added = false;
                    for name in names {
                        if !state.register_query(&name) {
                            debug!(artifact = %artifact, feed = %name, "query feed already live; extend is a no-op");
                            continue;
                        }
                        info!(artifact = %artifact, feed = %name, "registering query feed");
                        let rx = backend.query_events(&artifact, &name);
                        forwarders.spawn(forward_feed(
                            SourceKind::Query,
                            Some(name.clone()),
                            rx,
                            event_tx.clone(),
                            {
                                let feed = name.clone();
                                move |batch| SourceEvent::Query { feed: feed.clone(), batch }
                            },
                        ));
                        added = true;
                    }
                    if added {
                        rebuilds += 1;
                        publish(&state, &config, &tabs_tx, &badge_tx, &mut badge, &mut panes, rebuilds);
                    }
                }
            },
            event = events.recv() => match event {
                None => break,
                Some(event) => {
                    if let Some(failure) = state.apply(event) {
                        warn!(
                            artifact = %artifact,
                            source = %failure.source,
                            feed = ?failure.feed,
                            message = %failure.message,
                            "upstream feed failed; keeping composed panes"
                        );
                        failure_tx.send_replace(Some(failure));
                    } else {
                        rebuilds += 1;
                        publish(&state, &config, &tabs_tx, &badge_tx, &mut badge, &mut panes, rebuilds);
                    }
                }
            },
        }
    }

    forwarders.shutdown().await;
    info!(artifact = %artifact, "composer torn down");
}

/// Recompute from the join state and push the outputs.
fn publish(
    state: &JoinState,
    config: &ComposerConfig,
    tabs_tx: &watch::Sender<Vec<PaneSpec>>,
    badge_tx: &watch::Sender<usize>,
    badge: &mut BadgeTracker,
    panes: &mut Vec<PaneSpec>,
    rebuilds: u64,
) {
    let rebuild = state.recompute(&config.labels);
    debug!(
        artifact = %state.artifact(),
        rebuild = rebuilds,
        panes = rebuild.panes.len(),
        notable = rebuild.stats.build.notable,
        deferred = rebuild.stats.build.deferred_no_slot,
        elapsed_us = rebuild.stats.elapsed.as_micros() as u64,
        "recomposed pane list"
    );
    *panes = rebuild.panes.clone();
    tabs_tx.send_replace(rebuild.panes);
    if let Some(count) = badge.observe(panes) {
        badge_tx.send_replace(count);
    }
}

fn make_snapshot(state: &JoinState, panes: &[PaneSpec], rebuilds: u64) -> ComposerSnapshot {
    ComposerSnapshot {
        artifact: state.artifact().to_string(),
        streams_arrived: state.streams_arrived(),
        instances_arrived: state.instances_arrived(),
        registry_arrived: state.registry_arrived(),
        has_content: state.has_content(),
        query_feeds: state.query_names(),
        pane_identities: panes.iter().map(|p| p.identity.to_string()).collect(),
        badge: notable_count(panes),
        rebuilds,
    }
}

// =============================================================================
// Forwarders
// =============================================================================

/// Pump one feed subscription into the merged event channel.
///
/// Ends when the subscription closes or the composer goes away; a failed
/// send after teardown is dropped without logging.
async fn forward_feed<T, F>(
    source: SourceKind,
    feed: Option<String>,
    mut rx: mpsc::Receiver<FeedItem<T>>,
    tx: mpsc::Sender<SourceEvent>,
    wrap: F,
) where
    T: Send + 'static,
    F: Fn(T) -> SourceEvent + Send + 'static,
{
    while let Some(item) = rx.recv().await {
        let event = match item {
            Ok(value) => wrap(value),
            Err(error) => {
                SourceEvent::Failed(FeedFailure::from_error(source, feed.clone(), &error))
            }
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

/// Pump registry snapshots into the merged event channel.
async fn forward_registry(
    mut rx: mpsc::Receiver<RegistrySnapshot>,
    tx: mpsc::Sender<SourceEvent>,
) {
    while let Some(snapshot) = rx.recv().await {
        if tx.send(SourceEvent::Registry(snapshot)).await.is_err() {
            return;
        }
    }
}
