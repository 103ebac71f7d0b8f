//! ANN index maintenance.
//!
//! The HNSW graph is a batch-built structure; rebuilding it is a heavyweight
//! operation that runs outside the request path. The lifecycle is explicit:
//! a trigger enqueues a rebuild, the worker thread builds a fresh graph from
//! the rows present at that moment, and the finished snapshot is swapped in
//! atomically. Vectors ingested between builds stay visible through the
//! searcher's exact delta scan. The staleness window is a documented
//! tradeoff, observable by comparing a snapshot's coverage with the store's
//! vector-row count.

use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::Utc;
use crossbeam_channel::{Sender, unbounded};
use parking_lot::RwLock;

use crate::error::Result;
use crate::index::ContentIndexStore;
use crate::vector::hnsw::{HnswConfig, HnswGraph};
use crate::vector::searcher::AnnSnapshot;

/// The engine's handle on the active ANN snapshot.
///
/// Readers clone the inner `Arc` and keep searching the old graph while a
/// rebuild installs a new one; the swap itself is a pointer write under a
/// short lock.
#[derive(Debug, Default)]
pub struct AnnState {
    snapshot: RwLock<Option<Arc<AnnSnapshot>>>,
}

impl AnnState {
    /// Create an empty state with no snapshot installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently installed snapshot, if any.
    pub fn current(&self) -> Option<Arc<AnnSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Atomically install a new snapshot.
    pub fn install(&self, snapshot: AnnSnapshot) {
        *self.snapshot.write() = Some(Arc::new(snapshot));
    }

    /// Number of rows the installed snapshot covers.
    pub fn covered_rows(&self) -> usize {
        self.current().map_or(0, |s| s.graph.len())
    }
}

/// Build a fresh snapshot from the store's current vector rows.
pub fn rebuild(store: &ContentIndexStore, config: &HnswConfig) -> Result<AnnSnapshot> {
    let rows = store.vector_rows();
    let graph = HnswGraph::build(store.dimension(), config.clone(), rows)?;
    Ok(AnnSnapshot {
        graph,
        built_at: Utc::now(),
    })
}

enum WorkerMessage {
    Rebuild,
    Shutdown,
}

/// Background worker owning the rebuild loop.
///
/// Triggers are coalesced: however many arrive while a build is running, at
/// most one further build follows. Dropping the worker shuts the thread down.
#[derive(Debug)]
pub struct RebuildWorker {
    sender: Sender<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
}

impl RebuildWorker {
    /// Spawn the worker thread.
    pub fn spawn(
        store: Arc<ContentIndexStore>,
        ann: Arc<AnnState>,
        config: HnswConfig,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<WorkerMessage>();

        let handle = std::thread::Builder::new()
            .name("tessera-ann-rebuild".to_string())
            .spawn(move || {
                loop {
                    match receiver.recv() {
                        Ok(WorkerMessage::Rebuild) => {
                            // Coalesce whatever queued up behind this trigger.
                            let mut shutdown = false;
                            while let Ok(extra) = receiver.try_recv() {
                                if matches!(extra, WorkerMessage::Shutdown) {
                                    shutdown = true;
                                    break;
                                }
                            }

                            match rebuild(&store, &config) {
                                Ok(snapshot) => {
                                    log::debug!(
                                        "ANN rebuild finished: {} rows",
                                        snapshot.graph.len()
                                    );
                                    ann.install(snapshot);
                                }
                                Err(e) => log::warn!("ANN rebuild failed: {e}"),
                            }

                            if shutdown {
                                break;
                            }
                        }
                        Ok(WorkerMessage::Shutdown) | Err(_) => break,
                    }
                }
            })?;

        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Enqueue a rebuild. Returns immediately.
    pub fn trigger(&self) {
        if self.sender.send(WorkerMessage::Rebuild).is_err() {
            log::warn!("ANN rebuild worker is gone; trigger dropped");
        }
    }
}

impl Drop for RebuildWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
