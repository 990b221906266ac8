//! Play-session scrobbling: payloads and the durable pending-operation model
//!
//! A session is opened with a [`StartPayload`] (the server answers with a
//! session id) and closed with a [`FinishPayload`]. When either request cannot
//! be delivered it is wrapped in a [`PendingOperation`] and persisted for a
//! later flush.
//!
//! ## Start/finish pairing
//!
//! If a game stops while its start request is still queued, no session id
//! exists yet. The finish is then queued with the [`QUEUED_SESSION_ID`]
//! sentinel, right behind the start, so replay preserves start-before-finish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Session reference used by a finish whose start has not been delivered yet
pub const QUEUED_SESSION_ID: &str = "queued";

fn require(value: &str, name: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingIdentifier(name.to_string()));
    }
    Ok(())
}

// ============================================================================
// Payloads
// ============================================================================

/// Body of a session start request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub install_id: String,
    /// Stable local identifier of the game
    pub game_id: String,
    pub external_id: String,
    pub plugin_id: String,
    pub game_name: String,
    pub started_at: DateTime<Utc>,
}

impl StartPayload {
    /// Checks that every identifier the server requires is present
    pub fn validate(&self) -> Result<(), DomainError> {
        require(&self.install_id, "install_id")?;
        require(&self.game_id, "game_id")?;
        Ok(())
    }
}

/// Body of a session finish request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishPayload {
    pub install_id: String,
    /// Session id returned by the start call, or [`QUEUED_SESSION_ID`]
    pub session_id: String,
    pub game_id: String,
    pub external_id: String,
    pub plugin_id: String,
    /// Duration of this session
    pub session_seconds: u64,
    /// Lifetime playtime reported by the host after the session
    pub total_playtime_seconds: u64,
    pub ended_at: DateTime<Utc>,
}

impl FinishPayload {
    /// Checks that every identifier the server requires is present
    pub fn validate(&self) -> Result<(), DomainError> {
        require(&self.install_id, "install_id")?;
        require(&self.session_id, "session_id")?;
        require(&self.game_id, "game_id")?;
        Ok(())
    }

    /// Returns true if this finish still references the queued-start sentinel
    pub fn has_queued_session(&self) -> bool {
        self.session_id == QUEUED_SESSION_ID
    }
}

// ============================================================================
// PendingOperation
// ============================================================================

/// Discriminant of a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Start,
    Finish,
}

impl std::fmt::Display for PendingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingKind::Start => write!(f, "start"),
            PendingKind::Finish => write!(f, "finish"),
        }
    }
}

/// The request carried by a pending operation.
///
/// Exactly one payload exists and it always matches the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum PendingPayload {
    Start(StartPayload),
    Finish(FinishPayload),
}

/// A start/finish request that could not be delivered and awaits a flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub operation: PendingPayload,
    pub queued_at: DateTime<Utc>,
    /// Number of flush cycles that already failed to deliver this operation
    #[serde(default)]
    pub flush_attempts: u32,
}

impl PendingOperation {
    /// Wraps a start payload queued now
    pub fn start(payload: StartPayload) -> Self {
        Self {
            operation: PendingPayload::Start(payload),
            queued_at: Utc::now(),
            flush_attempts: 0,
        }
    }

    /// Wraps a finish payload queued now
    pub fn finish(payload: FinishPayload) -> Self {
        Self {
            operation: PendingPayload::Finish(payload),
            queued_at: Utc::now(),
            flush_attempts: 0,
        }
    }

    pub fn kind(&self) -> PendingKind {
        match self.operation {
            PendingPayload::Start(_) => PendingKind::Start,
            PendingPayload::Finish(_) => PendingKind::Finish,
        }
    }

    /// Local game id the operation refers to
    pub fn game_id(&self) -> &str {
        match &self.operation {
            PendingPayload::Start(p) => &p.game_id,
            PendingPayload::Finish(p) => &p.game_id,
        }
    }
}

// ============================================================================
// ActiveSessionState
// ============================================================================

/// Session bookkeeping persisted with the install state.
///
/// `pending_start_game_id` exists only while a start is queued and no session
/// id has been assigned yet. It is cleared once a start succeeds or once the
/// paired finish has been queued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveSessionState {
    pub active_session_id: Option<String>,
    /// Game the active session belongs to
    pub active_game_id: Option<String>,
    pub pending_start_game_id: Option<String>,
    /// When the current session began, delivered or not
    pub started_at: Option<DateTime<Utc>>,
}

impl ActiveSessionState {
    /// Records a delivered start
    pub fn begin(&mut self, game_id: &str, session_id: String, started_at: DateTime<Utc>) {
        self.active_session_id = Some(session_id);
        self.active_game_id = Some(game_id.to_string());
        self.pending_start_game_id = None;
        self.started_at = Some(started_at);
    }

    /// Records a start that was queued instead of delivered
    pub fn begin_pending(&mut self, game_id: &str, started_at: DateTime<Utc>) {
        self.active_session_id = None;
        self.active_game_id = None;
        self.pending_start_game_id = Some(game_id.to_string());
        self.started_at = Some(started_at);
    }

    /// Session id of the delivered session running for `game_id`, if any
    pub fn session_for(&self, game_id: &str) -> Option<&str> {
        match self.active_game_id.as_deref() {
            Some(active) if active == game_id => self.active_session_id.as_deref(),
            _ => None,
        }
    }

    /// Returns true if `game_id` is waiting on a queued start
    pub fn is_pending_start(&self, game_id: &str) -> bool {
        self.pending_start_game_id.as_deref() == Some(game_id)
    }

    /// Forgets the session for any game
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
