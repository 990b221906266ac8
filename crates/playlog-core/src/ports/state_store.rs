//! State store port (driven/secondary port)
//!
//! Three independent documents are persisted: the install state (identity,
//! cursor, session bookkeeping, allowed sources), the pending-operation
//! queue and the snapshot baseline. Each is loaded and saved on its own, so
//! a crash while writing one never corrupts the other two.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Loading a document that was never written yields its default value.
//! - Implementations serialize concurrent calls; callers may share one
//!   instance behind an `Arc`.

use crate::domain::{InstallState, PendingOperation, SnapshotBaseline};

/// Port trait for durable client-side state
#[async_trait::async_trait]
pub trait IStateStore: Send + Sync {
    async fn load_install_state(&self) -> anyhow::Result<InstallState>;

    async fn save_install_state(&self, state: &InstallState) -> anyhow::Result<()>;

    /// Loads the pending queue in insertion order
    async fn load_pending_queue(&self) -> anyhow::Result<Vec<PendingOperation>>;

    /// Replaces the persisted pending queue
    async fn save_pending_queue(&self, operations: &[PendingOperation]) -> anyhow::Result<()>;

    async fn load_baseline(&self) -> anyhow::Result<SnapshotBaseline>;

    async fn save_baseline(&self, baseline: &SnapshotBaseline) -> anyhow::Result<()>;
}
