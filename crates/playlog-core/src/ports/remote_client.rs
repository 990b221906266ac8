//! Remote client port (driven/secondary port)
//!
//! This module defines the interface to the telemetry service along with
//! the request and acknowledgement DTOs exchanged with it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because transport errors are adapter-specific.
//! - `Ok(None)` is the uniform "failed" signal (non-success status, empty
//!   body) and is distinct from a transport error (`Err`). Callers treat
//!   both as a failed attempt.
//! - Every call is safe to retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FinishPayload, GameAchievementsDto, GameDto, StartPayload};

// ============================================================================
// Requests
// ============================================================================

/// Full library upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFullRequest {
    pub install_id: String,
    pub library_hash: String,
    pub games: Vec<GameDto>,
}

/// Library delta relative to the baseline identified by `base_library_hash`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDiffRequest {
    pub install_id: String,
    /// Hash of the baseline the delta applies to, for server-side verification
    pub base_library_hash: Option<String>,
    pub library_hash: String,
    pub added: Vec<GameDto>,
    pub updated: Vec<GameDto>,
    pub removed: Vec<String>,
}

/// Full achievement upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsFullRequest {
    pub install_id: String,
    pub achievement_hash: String,
    pub games: Vec<GameAchievementsDto>,
}

/// Achievement delta relative to the baseline identified by `base_achievement_hash`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsDiffRequest {
    pub install_id: String,
    pub base_achievement_hash: Option<String>,
    pub achievement_hash: String,
    pub added: Vec<GameAchievementsDto>,
    pub updated: Vec<GameAchievementsDto>,
    pub removed: Vec<String>,
}

// ============================================================================
// Acknowledgement
// ============================================================================

/// Processing status reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AckStatus {
    Queued,
    Skipped,
    ForceFullSync,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Server acknowledgement of a sync or finish request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAck {
    pub success: bool,
    #[serde(default)]
    pub status: AckStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub cooldown_expires_at: Option<DateTime<Utc>>,
}

impl SyncAck {
    /// Server asks for the baseline to be discarded and a full resend
    pub fn is_force_full_sync(&self) -> bool {
        self.status == AckStatus::ForceFullSync
    }

    /// Server refused the request because a cooldown is in effect
    pub fn is_cooldown(&self) -> bool {
        self.reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with("cooldown"))
    }

    /// Server took the payload (queued, or skipped as already known)
    pub fn is_accepted(&self) -> bool {
        self.success && !self.is_force_full_sync() && !self.is_cooldown()
    }
}

// ============================================================================
// IRemoteClient trait
// ============================================================================

/// Port trait for the telemetry service
#[async_trait::async_trait]
pub trait IRemoteClient: Send + Sync {
    /// Opens a play session. Returns the server-assigned session id.
    async fn start_session(&self, payload: &StartPayload) -> anyhow::Result<Option<String>>;

    /// Closes a play session
    async fn finish_session(&self, payload: &FinishPayload) -> anyhow::Result<Option<SyncAck>>;

    /// Uploads the entire library
    async fn sync_library_full(
        &self,
        request: &LibraryFullRequest,
    ) -> anyhow::Result<Option<SyncAck>>;

    /// Uploads a library delta
    async fn sync_library_diff(
        &self,
        request: &LibraryDiffRequest,
    ) -> anyhow::Result<Option<SyncAck>>;

    /// Uploads all achievement data
    async fn sync_achievements_full(
        &self,
        request: &AchievementsFullRequest,
    ) -> anyhow::Result<Option<SyncAck>>;

    /// Uploads an achievement delta
    async fn sync_achievements_diff(
        &self,
        request: &AchievementsDiffRequest,
    ) -> anyhow::Result<Option<SyncAck>>;

    /// Lists the source plugin ids the server accepts
    async fn get_allowed_sources(&self) -> anyhow::Result<Option<Vec<String>>>;
}
