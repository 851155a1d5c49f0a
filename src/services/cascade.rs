//! Shared-element cascade: after a whiteboard save, re-project every shared
//! element that was copied from it and still has `auto_update` set.
//!
//! DESIGN
//! ======
//! Saves push the whiteboard id onto a bounded queue with `try_send` and
//! return immediately. A single background worker drains the queue and runs
//! [`resync_source`] for each id in arrival order. Each pass reads the
//! latest committed content, so the last save always wins.
//!
//! ERROR HANDLING
//! ==============
//! The cascade never fails the save that triggered it. A full queue drops the
//! id with a warning; per-element failures are logged and counted in the
//! [`CascadeReport`], never propagated.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::shared_element::{self, SharedElementError};
use crate::state::AppState;
use crate::store::DocumentStore;

/// Per-source tally of one cascade pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub refreshed: usize,
    /// `auto_update` was off.
    pub skipped: usize,
    /// No index survived; element kept its last copy.
    pub stale: usize,
    pub failed: usize,
}

/// Re-project every auto-updating shared element sourced from
/// `whiteboard_id`.
pub async fn resync_source(store: &dyn DocumentStore, whiteboard_id: Uuid) -> CascadeReport {
    let mut report = CascadeReport::default();

    let source = match store.get_whiteboard(whiteboard_id).await {
        Ok(Some(source)) => source,
        Ok(None) => {
            warn!(%whiteboard_id, "cascade source whiteboard no longer exists");
            return report;
        }
        Err(e) => {
            error!(error = %e, %whiteboard_id, "cascade failed to load source whiteboard");
            return report;
        }
    };
    let elements = match store.list_by_source(whiteboard_id).await {
        Ok(elements) => elements,
        Err(e) => {
            error!(error = %e, %whiteboard_id, "cascade failed to list shared elements");
            return report;
        }
    };

    for element in &elements {
        if !element.auto_update {
            report.skipped += 1;
            continue;
        }
        match shared_element::refresh_from(store, element, &source.content.elements).await {
            Ok(_) => report.refreshed += 1,
            Err(SharedElementError::SyncStale { reason, .. }) => {
                warn!(shared_element_id = %element.id, %whiteboard_id, reason, "cascade left stale shared element");
                report.stale += 1;
            }
            Err(e) => {
                warn!(error = %e, shared_element_id = %element.id, %whiteboard_id, "cascade failed to refresh shared element");
                report.failed += 1;
            }
        }
    }

    if !elements.is_empty() {
        info!(
            %whiteboard_id,
            refreshed = report.refreshed,
            skipped = report.skipped,
            stale = report.stale,
            failed = report.failed,
            "shared-element cascade finished"
        );
    }
    report
}

/// Spawn the cascade worker and return its queue sender and task handle.
/// The worker exits when every sender is dropped.
#[must_use]
pub fn spawn_cascade_worker(store: Arc<dyn DocumentStore>, capacity: usize) -> (mpsc::Sender<Uuid>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Uuid>(capacity.max(1));
    info!(queue_capacity = capacity, "shared-element cascade worker configured");

    let handle = tokio::spawn(async move {
        while let Some(whiteboard_id) = rx.recv().await {
            resync_source(store.as_ref(), whiteboard_id).await;
        }
        debug!("cascade queue closed; worker exiting");
    });

    (tx, handle)
}

/// Best-effort, non-blocking enqueue of a whiteboard for resync.
pub fn enqueue(state: &AppState, whiteboard_id: Uuid) {
    let Some(tx) = &state.cascade_tx else {
        return;
    };

    match tx.try_send(whiteboard_id) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(%whiteboard_id, "cascade queue full; dropping resync");
        }
        Err(TrySendError::Closed(_)) => {
            warn!(%whiteboard_id, "cascade queue closed; dropping resync");
        }
    }
}

#[cfg(test)]
#[path = "cascade_test.rs"]
mod tests;
