//! Domain entities and business logic
//!
//! This module contains the core domain types for Playlog:
//! - Per-game catalog records and achievement records
//! - Scrobble payloads and the durable pending-operation model
//! - Snapshot baselines and the sync cursor
//! - Canonical hashing and diff computation
//! - Domain-specific error types

pub mod diff;
pub mod errors;
pub mod game;
pub mod hashing;
pub mod scrobble;
pub mod snapshot;
pub mod sync_state;

// Re-export commonly used types
pub use diff::{compute_achievements_diff, compute_library_diff, AchievementsDiff, LibraryDiff};
pub use errors::DomainError;
pub use game::{AchievementDto, GameAchievementsDto, GameDto, GameMetadata};
pub use hashing::{
    compute_achievement_hash, compute_game_metadata_hash, compute_library_hash,
    format_timestamp,
};
pub use scrobble::{
    ActiveSessionState, FinishPayload, PendingKind, PendingOperation, PendingPayload,
    StartPayload, QUEUED_SESSION_ID,
};
pub use snapshot::{
    AchievementSnapshotItem, GameAchievementSnapshot, GameSnapshot, SnapshotBaseline,
};
pub use sync_state::{InstallState, SyncCursor, SyncKind, SyncMode, SyncOutcome};
