//! Sync orchestrator
//!
//! Ties the [`CircuitBreaker`], the [`PendingOperationQueue`] and the
//! [`SnapshotStore`] together:
//!
//! - [`session`] - play-session start/stop, queue flush, recovery listener
//! - [`library`] - library sync (full or diff, cooldown, force-full-sync)
//! - [`achievements`] - achievement sync, same state machine
//!
//! The orchestrator exclusively owns the install state (cursor, session
//! bookkeeping, allowed sources). Every change to it is persisted before it
//! is committed in memory.

mod achievements;
mod library;
mod session;

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use playlog_core::config::Config;
use playlog_core::domain::{ActiveSessionState, DomainError, InstallState, SyncCursor, SyncKind};
use playlog_core::ports::{
    IAchievementProvider, IGameLibrary, IRemoteClient, IStateStore, LibraryGame, SyncAck,
};

use crate::breaker::{BreakerError, CircuitBreaker, CircuitState};
use crate::queue::PendingOperationQueue;
use crate::snapshot::SnapshotStore;

// ============================================================================
// Settings and collaborators
// ============================================================================

/// Orchestrator tuning, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Attempts per remote call, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cooldown used when the server refuses a sync without an expiry
    pub default_cooldown: chrono::Duration,
    pub allowed_sources_ttl: chrono::Duration,
    pub max_flush_attempts: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.breaker.max_attempts.max(1),
            base_delay: config.breaker.base_delay(),
            default_cooldown: config.sync.default_cooldown(),
            allowed_sources_ttl: config.sync.allowed_sources_ttl(),
            max_flush_attempts: config.queue.max_flush_attempts.max(1),
        }
    }
}

/// Everything the orchestrator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn IRemoteClient>,
    pub store: Arc<dyn IStateStore>,
    pub library: Arc<dyn IGameLibrary>,
    pub achievements: Arc<dyn IAchievementProvider>,
    pub breaker: Arc<CircuitBreaker>,
}

/// Read-only view of the engine state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub install_id: String,
    pub breaker_state: CircuitState,
    pub breaker_failures: u32,
    pub pending_operations: usize,
    pub cursor: SyncCursor,
    pub session: ActiveSessionState,
    pub library_baseline_at: Option<DateTime<Utc>>,
    pub library_baseline_size: usize,
    pub achievements_baseline_at: Option<DateTime<Utc>>,
    pub achievements_baseline_size: usize,
    pub allowed_sources: Vec<String>,
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Session tracking and catalog sync over an unreliable remote service
pub struct SyncOrchestrator {
    remote: Arc<dyn IRemoteClient>,
    store: Arc<dyn IStateStore>,
    library: Arc<dyn IGameLibrary>,
    achievements: Arc<dyn IAchievementProvider>,
    breaker: Arc<CircuitBreaker>,
    queue: PendingOperationQueue,
    snapshots: SnapshotStore,
    state: Mutex<InstallState>,
    flush_lock: Mutex<()>,
    settings: OrchestratorSettings,
}

impl SyncOrchestrator {
    /// Loads persisted state and generates the install id on first run
    pub async fn load(deps: Collaborators, settings: OrchestratorSettings) -> anyhow::Result<Self> {
        let mut state = deps.store.load_install_state().await?;
        if state.ensure_install_id() {
            info!(install_id = %state.install_id, "Generated new install id");
            deps.store.save_install_state(&state).await?;
        }

        let queue =
            PendingOperationQueue::load(deps.store.clone(), settings.max_flush_attempts).await?;
        let snapshots = SnapshotStore::load(deps.store.clone()).await?;

        Ok(Self {
            remote: deps.remote,
            store: deps.store,
            library: deps.library,
            achievements: deps.achievements,
            breaker: deps.breaker,
            queue,
            snapshots,
            state: Mutex::new(state),
            flush_lock: Mutex::new(()),
            settings,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn queue(&self) -> &PendingOperationQueue {
        &self.queue
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub async fn install_id(&self) -> String {
        self.state.lock().await.install_id.clone()
    }

    /// Copy of the install state
    pub async fn install_state(&self) -> InstallState {
        self.state.lock().await.clone()
    }

    pub async fn status(&self) -> SyncStatus {
        let state = self.install_state().await;
        let (library_size, achievements_size) = self.snapshots.sizes().await;
        SyncStatus {
            install_id: state.install_id,
            breaker_state: self.breaker.state(),
            breaker_failures: self.breaker.failure_count(),
            pending_operations: self.queue.len().await,
            cursor: state.cursor,
            session: state.session,
            library_baseline_at: self.snapshots.library_baseline_at().await,
            library_baseline_size: library_size,
            achievements_baseline_at: self.snapshots.achievements_baseline_at().await,
            achievements_baseline_size: achievements_size,
            allowed_sources: state.allowed_sources,
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    /// Applies `change` to a copy of the install state, persists it, then commits it
    async fn update_state<F, R>(&self, change: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut InstallState) -> R,
    {
        let mut current = self.state.lock().await;
        let mut next = current.clone();
        let out = change(&mut next);
        self.store.save_install_state(&next).await?;
        *current = next;
        Ok(out)
    }

    /// Runs one remote call under the breaker.
    ///
    /// `Ok(None)` from the client counts as a failed attempt, like a
    /// transport error. Returns `None` when the call did not succeed.
    async fn call_remote<T, F, Fut>(&self, what: &'static str, mut call: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let result = self
            .breaker
            .execute(
                || {
                    let pending = call();
                    async move {
                        pending
                            .await?
                            .ok_or_else(|| anyhow::anyhow!("{what}: no usable response"))
                    }
                },
                self.settings.max_attempts,
                self.settings.base_delay,
            )
            .await;

        match result {
            Ok(value) => Some(value),
            Err(BreakerError::Open) => {
                debug!(call = what, "Circuit open, remote call skipped");
                None
            }
            Err(BreakerError::Operation(e)) => {
                warn!(call = what, error = %e, "Remote call failed");
                None
            }
        }
    }

    async fn find_game(&self, game_id: &str) -> anyhow::Result<LibraryGame> {
        let game = self.library.find_game(game_id).await?;
        Ok(game.ok_or_else(|| DomainError::ValidationFailed(format!("unknown game: {game_id}")))?)
    }

    /// Source plugin ids the server accepts, refreshed once the TTL expires.
    ///
    /// Falls back to the cached list if the refresh fails. An empty list
    /// means "unknown" and disables filtering.
    async fn allowed_sources(&self) -> Vec<String> {
        let now = Utc::now();
        let (cached, fetched_at) = {
            let state = self.state.lock().await;
            (state.allowed_sources.clone(), state.allowed_sources_fetched_at)
        };
        if fetched_at.is_some_and(|at| now - at < self.settings.allowed_sources_ttl) {
            return cached;
        }

        let remote = self.remote.as_ref();
        let Some(sources) = self
            .call_remote("allowed sources", move || remote.get_allowed_sources())
            .await
        else {
            debug!(cached = cached.len(), "Using cached allowed sources");
            return cached;
        };

        let fresh = sources.clone();
        let saved = self
            .update_state(move |s| {
                s.allowed_sources = fresh;
                s.allowed_sources_fetched_at = Some(now);
            })
            .await;
        if let Err(e) = saved {
            warn!(error = %e, "Failed to persist allowed sources");
        }
        debug!(count = sources.len(), "Refreshed allowed sources");
        sources
    }

    /// Current catalog, filtered to the allowed sources
    async fn catalog(&self) -> anyhow::Result<Vec<LibraryGame>> {
        let games = self.library.games().await?;
        let allowed = self.allowed_sources().await;
        let total = games.len();

        let games: Vec<LibraryGame> = games
            .into_iter()
            .filter(|game| is_allowed(&allowed, &game.plugin_id))
            .collect();
        if games.len() < total {
            debug!(kept = games.len(), total, "Filtered catalog to allowed sources");
        }
        Ok(games)
    }

    /// Decides what a sync acknowledgement asks for
    fn classify_ack(&self, ack: &SyncAck, now: DateTime<Utc>) -> AckAction {
        if ack.is_force_full_sync() {
            AckAction::ForceFull
        } else if ack.is_cooldown() {
            let until = ack
                .cooldown_expires_at
                .unwrap_or(now + self.settings.default_cooldown);
            AckAction::Cooldown(until)
        } else if ack.is_accepted() {
            AckAction::Commit
        } else {
            AckAction::Reject
        }
    }

    /// Remembers a server cooldown so the next attempts skip the network
    async fn enter_cooldown(&self, kind: SyncKind, until: DateTime<Utc>) -> anyhow::Result<()> {
        info!(%kind, %until, "Server requested cooldown");
        self.update_state(move |s| s.cursor.set_cooldown_until(kind, Some(until)))
            .await
    }
}

/// Reaction to a sync acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckAction {
    /// Accepted: commit baseline and cursor
    Commit,
    /// Drop the baseline and resend everything
    ForceFull,
    /// Refused until the given time
    Cooldown(DateTime<Utc>),
    Reject,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("settings", &self.settings)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

fn is_allowed(allowed: &[String], plugin_id: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|s| s.eq_ignore_ascii_case(plugin_id))
}

/// Seconds between two instants, clamped at zero
fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testing;
