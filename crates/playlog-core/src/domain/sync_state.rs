//! Sync cursor, install state and coarse outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scrobble::ActiveSessionState;

/// Catalog dimension being synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Library,
    Achievements,
}

impl std::fmt::Display for SyncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncKind::Library => write!(f, "library"),
            SyncKind::Achievements => write!(f, "achievements"),
        }
    }
}

/// Whether the whole catalog or only the delta is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Diff,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Diff => write!(f, "diff"),
        }
    }
}

/// Coarse result of a sync attempt, all that schedulers and UI need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The server acknowledged the payload
    Success,
    /// Nothing changed since the last acknowledged sync
    Skipped,
    /// A cooldown is in effect; the remote service was not asked (or refused)
    Cooldown,
    /// The attempt failed; cursor and baseline are untouched
    Error,
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Success => write!(f, "success"),
            SyncOutcome::Skipped => write!(f, "skipped"),
            SyncOutcome::Cooldown => write!(f, "cooldown"),
            SyncOutcome::Error => write!(f, "error"),
        }
    }
}

/// Progress of library and achievement sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncCursor {
    pub last_library_hash: Option<String>,
    pub last_achievement_hash: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_count: u64,
    pub library_cooldown_until: Option<DateTime<Utc>>,
    pub achievement_diff_cooldown_until: Option<DateTime<Utc>>,
}

impl SyncCursor {
    /// Last acknowledged hash of the given dimension
    pub fn last_hash(&self, kind: SyncKind) -> Option<&str> {
        match kind {
            SyncKind::Library => self.last_library_hash.as_deref(),
            SyncKind::Achievements => self.last_achievement_hash.as_deref(),
        }
    }

    pub fn set_last_hash(&mut self, kind: SyncKind, hash: Option<String>) {
        match kind {
            SyncKind::Library => self.last_library_hash = hash,
            SyncKind::Achievements => self.last_achievement_hash = hash,
        }
    }

    pub fn cooldown_until(&self, kind: SyncKind) -> Option<DateTime<Utc>> {
        match kind {
            SyncKind::Library => self.library_cooldown_until,
            SyncKind::Achievements => self.achievement_diff_cooldown_until,
        }
    }

    pub fn set_cooldown_until(&mut self, kind: SyncKind, until: Option<DateTime<Utc>>) {
        match kind {
            SyncKind::Library => self.library_cooldown_until = until,
            SyncKind::Achievements => self.achievement_diff_cooldown_until = until,
        }
    }

    /// Returns true if a remembered cooldown for `kind` is still in the future
    pub fn in_cooldown(&self, kind: SyncKind, now: DateTime<Utc>) -> bool {
        self.cooldown_until(kind).is_some_and(|until| until > now)
    }
}

/// Install identity and everything persisted in the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallState {
    /// Stable per-installation identifier sent with every request
    pub install_id: String,
    pub cursor: SyncCursor,
    pub session: ActiveSessionState,
    /// Source plugin ids the server accepts; empty means "not known"
    pub allowed_sources: Vec<String>,
    pub allowed_sources_fetched_at: Option<DateTime<Utc>>,
}

impl InstallState {
    /// Creates a fresh state with a newly generated install id
    pub fn new() -> Self {
        Self {
            install_id: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    /// Generates an install id if none is stored yet. Returns true if one was created.
    pub fn ensure_install_id(&mut self) -> bool {
        if self.install_id.is_empty() {
            self.install_id = uuid::Uuid::new_v4().to_string();
            return true;
        }
        false
    }
}
