//! Durable pending-operation queue
//!
//! Holds session start/finish requests that could not be delivered. Every
//! mutation is persisted through the [`IStateStore`] before it becomes
//! visible, so the queue survives the host process being killed.
//!
//! The queue itself knows nothing about delivery; the flush loop lives in
//! the orchestrator and uses [`mark_failed`] to decide between re-queueing
//! and dropping an operation.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use playlog_core::domain::PendingOperation;
use playlog_core::ports::IStateStore;

/// Result of one flush cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Operations the server accepted
    pub delivered: usize,
    /// Operations put back for the next flush
    pub requeued: usize,
    /// Operations discarded permanently
    pub dropped: usize,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.delivered + self.requeued + self.dropped
    }
}

/// Outcome of a failed replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushDisposition {
    /// Under the cap: try again on the next flush
    Requeue(PendingOperation),
    /// Cap reached: never retried again
    Drop(PendingOperation),
}

/// Records one failed flush cycle for `op` and decides its fate
pub fn mark_failed(mut op: PendingOperation, max_flush_attempts: u32) -> FlushDisposition {
    op.flush_attempts = op.flush_attempts.saturating_add(1);
    if op.flush_attempts >= max_flush_attempts {
        FlushDisposition::Drop(op)
    } else {
        FlushDisposition::Requeue(op)
    }
}

/// Persistent FIFO of undelivered operations
pub struct PendingOperationQueue {
    store: Arc<dyn IStateStore>,
    items: Mutex<Vec<PendingOperation>>,
    max_flush_attempts: u32,
}

impl PendingOperationQueue {
    /// Loads the persisted queue
    pub async fn load(store: Arc<dyn IStateStore>, max_flush_attempts: u32) -> anyhow::Result<Self> {
        let items = store.load_pending_queue().await?;
        if !items.is_empty() {
            debug!(count = items.len(), "Loaded pending operations");
        }
        Ok(Self {
            store,
            items: Mutex::new(items),
            max_flush_attempts: max_flush_attempts.max(1),
        })
    }

    pub fn max_flush_attempts(&self) -> u32 {
        self.max_flush_attempts
    }

    /// Appends `op` and persists the queue.
    ///
    /// If persisting fails the operation is not kept in memory either.
    pub async fn enqueue(&self, op: PendingOperation) -> anyhow::Result<()> {
        let mut items = self.items.lock().await;
        debug!(kind = %op.kind(), game_id = op.game_id(), "Queueing pending operation");
        items.push(op);
        if let Err(e) = self.store.save_pending_queue(&items).await {
            items.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Takes every queued operation, leaving the queue empty.
    ///
    /// Enqueues issued while the caller replays the drained items land in a
    /// fresh list and are not affected.
    pub async fn dequeue_all(&self) -> anyhow::Result<Vec<PendingOperation>> {
        let mut items = self.items.lock().await;
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.store.save_pending_queue(&[]).await?;
        Ok(std::mem::take(&mut *items))
    }

    /// Puts `ops` back ahead of anything enqueued since they were drained,
    /// keeping their relative order.
    ///
    /// The operations stay in memory even if persisting fails; the next
    /// successful write stores them.
    pub async fn requeue_front(&self, ops: Vec<PendingOperation>) -> anyhow::Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut items = self.items.lock().await;
        let newer = items.len();
        let mut merged = ops;
        merged.append(&mut *items);
        let saved = self.store.save_pending_queue(&merged).await;
        *items = merged;
        if let Err(e) = saved {
            warn!(error = %e, "Failed to persist re-queued operations, keeping them in memory");
            return Err(e);
        }
        debug!(requeued = items.len() - newer, newer, "Re-queued pending operations");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Copy of the queued operations, in order
    pub async fn snapshot(&self) -> Vec<PendingOperation> {
        self.items.lock().await.clone()
    }
}

impl std::fmt::Debug for PendingOperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOperationQueue")
            .field("max_flush_attempts", &self.max_flush_attempts)
            .finish_non_exhaustive()
    }
}
