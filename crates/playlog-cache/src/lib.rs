//! Playlog Cache - Durable client state
//!
//! File-based persistence for:
//! - Install identity, sync cursor and session bookkeeping
//! - The pending-operation queue
//! - Snapshot baselines
//!
//! ## Architecture
//!
//! This crate implements the `IStateStore` port from `playlog-core`. It is a
//! driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`JsonFileStore`] - Three independent JSON documents, written atomically
//! - [`InMemoryStateStore`] - Volatile store for tests and embedding
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use playlog_cache::JsonFileStore;
//! use playlog_core::ports::IStateStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = JsonFileStore::new(Path::new("/home/user/.local/share/playlog"));
//! let state = store.load_install_state().await?;
//! # Ok(())
//! # }
//! ```

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileStore;
pub use memory::InMemoryStateStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a state file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of a state document failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
