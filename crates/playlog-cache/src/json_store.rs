//! JSON file state store
//!
//! Each document lives in its own file inside the data directory:
//!
//! | File | Content |
//! |---|---|
//! | `settings.json` | [`InstallState`] |
//! | `pending_queue.json` | pending operations, in queue order |
//! | `snapshots.json` | [`SnapshotBaseline`] |
//!
//! ## Durability
//!
//! - **Atomic writes**: a document is written to `<file>.tmp` and renamed
//!   over the target, so a crash leaves either the old or the new version.
//! - **Independent files**: a torn or corrupt document never affects the
//!   other two.
//! - **Corruption recovery**: a document that fails to parse is renamed to
//!   `<file>.corrupt` and replaced by its default value.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use playlog_core::domain::{InstallState, PendingOperation, SnapshotBaseline};
use playlog_core::ports::IStateStore;

use crate::StoreError;

const SETTINGS_FILE: &str = "settings.json";
const QUEUE_FILE: &str = "pending_queue.json";
const SNAPSHOT_FILE: &str = "snapshots.json";

/// [`IStateStore`] backed by three JSON files
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes every load and save on this instance
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

/// Appends `suffix` to the full file name (`a.json` -> `a.json.tmp`)
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(suffix);
    PathBuf::from(p)
}

/// Reads a document, returning the default if it does not exist or is corrupt
async fn read_document<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "state file missing, using defaults");
            return Ok(T::default());
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    match serde_json::from_slice(&bytes) {
        Ok(doc) => Ok(doc),
        Err(parse_err) => {
            let quarantine = sibling(path, ".corrupt");
            warn!(
                ?path,
                ?quarantine,
                error = %parse_err,
                "state file is corrupt, moving it aside and starting fresh"
            );
            tokio::fs::rename(path, &quarantine)
                .await
                .map_err(|e| StoreError::io(path, e))?;
            Ok(T::default())
        }
    }
}

/// Writes a document via temp file + rename
async fn write_document<T>(path: &Path, doc: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let data = serde_json::to_vec_pretty(doc)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;

    // Same directory, so the rename stays on one filesystem
    let tmp_path = sibling(path, ".tmp");
    tokio::fs::write(&tmp_path, &data)
        .await
        .map_err(|e| StoreError::io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StoreError::io(path, e))?;

    debug!(?path, bytes = data.len(), "state file written");
    Ok(())
}

#[async_trait::async_trait]
impl IStateStore for JsonFileStore {
    #[instrument(skip(self))]
    async fn load_install_state(&self) -> anyhow::Result<InstallState> {
        let _guard = self.lock.lock().await;
        Ok(read_document(&self.path(SETTINGS_FILE)).await?)
    }

    #[instrument(skip(self, state))]
    async fn save_install_state(&self, state: &InstallState) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        Ok(write_document(&self.path(SETTINGS_FILE), state).await?)
    }

    #[instrument(skip(self))]
    async fn load_pending_queue(&self) -> anyhow::Result<Vec<PendingOperation>> {
        let _guard = self.lock.lock().await;
        Ok(read_document(&self.path(QUEUE_FILE)).await?)
    }

    #[instrument(skip(self, operations), fields(count = operations.len()))]
    async fn save_pending_queue(&self, operations: &[PendingOperation]) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        Ok(write_document(&self.path(QUEUE_FILE), operations).await?)
    }

    #[instrument(skip(self))]
    async fn load_baseline(&self) -> anyhow::Result<SnapshotBaseline> {
        let _guard = self.lock.lock().await;
        Ok(read_document(&self.path(SNAPSHOT_FILE)).await?)
    }

    #[instrument(skip(self, baseline))]
    async fn save_baseline(&self, baseline: &SnapshotBaseline) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        Ok(write_document(&self.path(SNAPSHOT_FILE), baseline).await?)
    }
}
