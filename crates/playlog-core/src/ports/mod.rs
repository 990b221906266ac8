//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteClient`] - Telemetry service calls (scrobble, sync, allowed sources)
//! - [`IStateStore`] - Durable install state, pending queue and baseline
//! - [`IGameLibrary`] - Host game catalog
//! - [`IAchievementProvider`] - Achievement data sources

pub mod library;
pub mod remote_client;
pub mod state_store;

pub use library::{
    AchievementCounts, CompositeAchievementProvider, IAchievementProvider, IGameLibrary,
    LibraryGame,
};
pub use remote_client::{
    AchievementsDiffRequest, AchievementsFullRequest, AckStatus, IRemoteClient,
    LibraryDiffRequest, LibraryFullRequest, SyncAck,
};
pub use state_store::IStateStore;
