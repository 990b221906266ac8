//! Volatile state store
//!
//! Holds the three documents in memory. Used by tests and by embedders that
//! manage persistence themselves.

use tokio::sync::Mutex;

use playlog_core::domain::{InstallState, PendingOperation, SnapshotBaseline};
use playlog_core::ports::IStateStore;

#[derive(Debug, Default)]
struct Documents {
    install: InstallState,
    queue: Vec<PendingOperation>,
    baseline: SnapshotBaseline,
}

/// [`IStateStore`] that never touches the disk
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    docs: Mutex<Documents>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose install state is already populated
    pub fn with_install_state(install: InstallState) -> Self {
        Self {
            docs: Mutex::new(Documents {
                install,
                ..Default::default()
            }),
        }
    }
}

#[async_trait::async_trait]
impl IStateStore for InMemoryStateStore {
    async fn load_install_state(&self) -> anyhow::Result<InstallState> {
        Ok(self.docs.lock().await.install.clone())
    }

    async fn save_install_state(&self, state: &InstallState) -> anyhow::Result<()> {
        self.docs.lock().await.install = state.clone();
        Ok(())
    }

    async fn load_pending_queue(&self) -> anyhow::Result<Vec<PendingOperation>> {
        Ok(self.docs.lock().await.queue.clone())
    }

    async fn save_pending_queue(&self, operations: &[PendingOperation]) -> anyhow::Result<()> {
        self.docs.lock().await.queue = operations.to_vec();
        Ok(())
    }

    async fn load_baseline(&self) -> anyhow::Result<SnapshotBaseline> {
        Ok(self.docs.lock().await.baseline.clone())
    }

    async fn save_baseline(&self, baseline: &SnapshotBaseline) -> anyhow::Result<()> {
        self.docs.lock().await.baseline = baseline.clone();
        Ok(())
    }
}
