//! Snapshot intake loop.
//!
//! Raw payloads from the extension messaging boundary arrive on an mpsc
//! queue and are validated, applied to the store, and fanned out to view
//! subscribers strictly in arrival order. A single consumer draining one
//! queue is what gives the "later snapshot always wins" ordering guarantee;
//! the stop-guard semantics belong to the store and are never bypassed here.
//!
//! The store is shared behind `Arc<Mutex<..>>` and locked once per payload,
//! so user operations (stop, load, delete) interleave with snapshot intake
//! at any queue boundary instead of waiting for the queue to close.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, warn};

use crate::channel::ScanChannel;
use crate::diff::TranscriptDiff;
use crate::storage::StorageBackend;
use crate::store::{SessionStore, SnapshotOutcome};
use meetlog_protocol::{parse_snapshot, CaptionEntry};

/// What the view layer receives after each applied snapshot: the change set
/// for incremental DOM updates plus the filtered list for full redraws.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub diff: TranscriptDiff,
    pub visible: Vec<CaptionEntry>,
}

pub struct ReconciliationLoop {
    rx: mpsc::Receiver<Value>,
    updates: broadcast::Sender<SnapshotUpdate>,
}

impl ReconciliationLoop {
    /// Creates the loop and the sender the messaging boundary pushes raw
    /// snapshot payloads into.
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<Value>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (updates, _) = broadcast::channel(capacity);
        (Self { rx, updates }, tx)
    }

    /// Subscribes a view to applied-snapshot updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.updates.subscribe()
    }

    /// Drains the queue until the sender side closes. Malformed payloads are
    /// logged and dropped; guard-ignored snapshots produce no update. The
    /// store lock is taken per payload and released between payloads.
    pub async fn run<S: StorageBackend, C: ScanChannel>(
        mut self,
        store: Arc<Mutex<SessionStore<S, C>>>,
    ) {
        while let Some(payload) = self.rx.recv().await {
            let snapshot = match parse_snapshot(payload) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(code = %err.code, message = %err.message, "Dropping malformed snapshot");
                    continue;
                }
            };

            let mut store = store.lock().await;
            match store.apply_scan_snapshot(snapshot, chrono::Utc::now()).await {
                Ok(SnapshotOutcome::Applied { diff, visible }) => {
                    debug!(
                        added = diff.added.len(),
                        updated = diff.updated.len(),
                        removed = diff.removed.len(),
                        "Snapshot applied"
                    );
                    // Send fails only when no view is subscribed; fine.
                    let _ = self.updates.send(SnapshotUpdate { diff, visible });
                }
                Ok(SnapshotOutcome::Ignored) => {
                    debug!("Snapshot ignored by recording guard");
                }
                Err(err) => {
                    warn!(error = %err, "Failed to apply snapshot");
                }
            }
        }
        debug!("Snapshot queue closed; reconciliation loop exiting");
    }
}
