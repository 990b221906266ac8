//! Playlog Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `GameDto`, `PendingOperation`, `SnapshotBaseline`, `SyncCursor`
//! - **Canonical hashing** - metadata, library and achievement hashes shared with the server
//! - **Diff computation** - added/updated/removed classification against a baseline
//! - **Port definitions** - Traits for adapters: `IRemoteClient`, `IStateStore`,
//!   `IGameLibrary`, `IAchievementProvider`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
