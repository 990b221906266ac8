//! Play-session tracking and pending-queue flush
//!
//! A start or finish that cannot be delivered after its immediate retries
//! is queued. The queue is replayed on startup and whenever the breaker
//! recovers, through the same send path live events use.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use playlog_core::domain::{
    FinishPayload, PendingKind, PendingOperation, PendingPayload, StartPayload,
    QUEUED_SESSION_ID,
};

use super::{elapsed_seconds, SyncOrchestrator};
use crate::queue::{mark_failed, FlushDisposition, FlushReport};

impl SyncOrchestrator {
    // ========================================================================
    // Live events
    // ========================================================================

    /// Reports that a game started.
    ///
    /// Returns `Ok(true)` if the server opened a session, `Ok(false)` if the
    /// start was queued for a later flush.
    #[instrument(skip(self))]
    pub async fn on_game_started(&self, game_id: &str) -> anyhow::Result<bool> {
        let game = self.find_game(game_id).await?;
        let started_at = Utc::now();
        let payload = StartPayload {
            install_id: self.install_id().await,
            game_id: game.id,
            external_id: game.external_id,
            plugin_id: game.plugin_id,
            game_name: game.name,
            started_at,
        };
        payload.validate()?;

        if let Some(session_id) = self.send_start(&payload).await {
            info!(%session_id, "Session started");
            self.update_state(move |s| s.session.begin(game_id, session_id, started_at))
                .await?;
            return Ok(true);
        }

        // The marker goes first and never outlives a start that was not queued
        let previous = self.state.lock().await.session.clone();
        self.update_state(move |s| s.session.begin_pending(game_id, started_at))
            .await?;
        if let Err(e) = self.queue.enqueue(PendingOperation::start(payload)).await {
            if let Err(restore) = self.update_state(move |s| s.session = previous).await {
                warn!(error = %restore, "Failed to roll back pending-start marker");
            }
            return Err(e);
        }
        info!("Start queued for later delivery");
        Ok(false)
    }

    /// Reports that a game stopped.
    ///
    /// `session_seconds` is the duration reported by the host; when absent
    /// it is derived from the recorded start time. Returns `Ok(true)` if the
    /// finish was delivered, `Ok(false)` if it was queued.
    #[instrument(skip(self))]
    pub async fn on_game_stopped(
        &self,
        game_id: &str,
        session_seconds: Option<u64>,
    ) -> anyhow::Result<bool> {
        let game = self.find_game(game_id).await?;
        let ended_at = Utc::now();
        let (install_id, session) = {
            let state = self.state.lock().await;
            (state.install_id.clone(), state.session.clone())
        };

        let session_seconds = session_seconds
            .or_else(|| session.started_at.map(|at| elapsed_seconds(at, ended_at)))
            .unwrap_or(0);
        let mut payload = FinishPayload {
            install_id,
            session_id: String::new(),
            game_id: game.id,
            external_id: game.external_id,
            plugin_id: game.plugin_id,
            session_seconds,
            total_playtime_seconds: game.playtime_seconds,
            ended_at,
        };

        // No session id exists yet: queue behind the start, never send live
        if session.is_pending_start(game_id) {
            payload.session_id = QUEUED_SESSION_ID.to_string();
            self.queue.enqueue(PendingOperation::finish(payload)).await?;
            self.update_state(|s| s.session.clear()).await?;
            info!("Start still queued, finish queued behind it");
            return Ok(false);
        }

        payload.session_id = session.session_for(game_id).unwrap_or_default().to_string();
        payload.validate()?;

        let delivered = self.send_finish(&payload).await;
        if delivered {
            info!(session_id = %payload.session_id, session_seconds, "Session finished");
        } else {
            self.queue.enqueue(PendingOperation::finish(payload)).await?;
            info!("Finish queued for later delivery");
        }
        self.update_state(|s| s.session.clear()).await?;
        Ok(delivered)
    }

    // ========================================================================
    // Single-call send path
    // ========================================================================

    async fn send_start(&self, payload: &StartPayload) -> Option<String> {
        let remote = self.remote.as_ref();
        self.call_remote("session start", move || remote.start_session(payload))
            .await
            .filter(|session_id| !session_id.is_empty())
    }

    async fn send_finish(&self, payload: &FinishPayload) -> bool {
        let remote = self.remote.as_ref();
        match self
            .call_remote("session finish", move || remote.finish_session(payload))
            .await
        {
            Some(ack) if ack.success => true,
            Some(ack) => {
                warn!(reason = ?ack.reason, "Server rejected session finish");
                false
            }
            None => false,
        }
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Replays every queued operation once.
    ///
    /// Only one flush runs at a time; a call that finds another flush in
    /// progress returns an empty report. Operations that fail again are
    /// re-queued ahead of anything enqueued meanwhile, until they reach the
    /// flush-attempt cap and are dropped.
    #[instrument(skip(self))]
    pub async fn flush_pending_operations(&self) -> anyhow::Result<FlushReport> {
        let Ok(_flushing) = self.flush_lock.try_lock() else {
            debug!("Flush already in progress");
            return Ok(FlushReport::default());
        };

        let items = self.queue.dequeue_all().await?;
        if items.is_empty() {
            return Ok(FlushReport::default());
        }
        info!(count = items.len(), "Flushing pending operations");

        let max_attempts = self.queue.max_flush_attempts();
        let mut report = FlushReport::default();
        let mut requeue = Vec::new();
        // Fate of the most recent start of each game seen so far; a sentinel
        // finish pairs with the start right before it
        let mut replayed: HashMap<String, ReplayedStart> = HashMap::new();
        let last_starts = last_start_index(&items);

        for (index, mut op) in items.into_iter().enumerate() {
            let delivered = match &mut op.operation {
                PendingPayload::Start(payload) => match self.send_start(payload).await {
                    Some(session_id) => {
                        if last_starts.get(&payload.game_id) == Some(&index) {
                            self.bind_replayed_start(payload, &session_id).await;
                        }
                        replayed.insert(
                            payload.game_id.clone(),
                            ReplayedStart::Delivered(session_id),
                        );
                        true
                    }
                    None => false,
                },
                PendingPayload::Finish(payload) => {
                    if payload.has_queued_session() {
                        match replayed.get(&payload.game_id) {
                            Some(ReplayedStart::Delivered(session_id)) => {
                                payload.session_id = session_id.clone();
                            }
                            Some(ReplayedStart::Requeued) => {
                                // Its start is waiting again; keep the pair together untouched
                                requeue.push(op);
                                report.requeued += 1;
                                continue;
                            }
                            None => {
                                warn!(
                                    game_id = %payload.game_id,
                                    "Dropping finish whose start was lost"
                                );
                                report.dropped += 1;
                                continue;
                            }
                        }
                    }
                    self.send_finish(payload).await
                }
            };

            if delivered {
                report.delivered += 1;
                continue;
            }

            let is_start = matches!(op.operation, PendingPayload::Start(_));
            let game_id = op.game_id().to_string();
            match mark_failed(op, max_attempts) {
                FlushDisposition::Requeue(op) => {
                    if is_start {
                        replayed.insert(game_id, ReplayedStart::Requeued);
                    }
                    requeue.push(op);
                    report.requeued += 1;
                }
                FlushDisposition::Drop(op) => {
                    if is_start {
                        replayed.remove(&game_id);
                    }
                    warn!(
                        kind = %op.kind(),
                        game_id = %game_id,
                        attempts = op.flush_attempts,
                        "Dropping pending operation after repeated failures"
                    );
                    report.dropped += 1;
                }
            }
        }

        self.queue.requeue_front(requeue).await?;
        info!(
            delivered = report.delivered,
            requeued = report.requeued,
            dropped = report.dropped,
            "Flush complete"
        );
        Ok(report)
    }

    /// A replayed start succeeded: if it is the start the pending marker
    /// refers to, its session id becomes the active session.
    async fn bind_replayed_start(&self, payload: &StartPayload, session_id: &str) {
        let still_running = {
            let session = &self.state.lock().await.session;
            session.is_pending_start(&payload.game_id)
                && session.started_at == Some(payload.started_at)
        };
        if !still_running {
            return;
        }

        let game_id = payload.game_id.clone();
        let session_id = session_id.to_string();
        let started_at = payload.started_at;
        let result = self
            .update_state(move |s| s.session.begin(&game_id, session_id, started_at))
            .await;
        match result {
            Ok(()) => debug!(game_id = %payload.game_id, "Replayed start bound to running game"),
            Err(e) => warn!(error = %e, "Failed to persist replayed session"),
        }
    }

    // ========================================================================
    // Recovery listener
    // ========================================================================

    /// Flushes the queue every time the breaker recovers, until cancelled
    pub fn spawn_recovery_listener(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut recovered = self.breaker.subscribe();
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = recovered.recv() => match event {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            info!("Remote service recovered, flushing pending operations");
                            if let Err(e) = this.flush_pending_operations().await {
                                warn!(error = %e, "Flush after recovery failed");
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Recovery listener stopped");
        })
    }
}

/// Fate of a start replayed during the current flush
enum ReplayedStart {
    Delivered(String),
    Requeued,
}

/// Position of the last queued start of each game
fn last_start_index(items: &[PendingOperation]) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind() == PendingKind::Start)
        .map(|(index, op)| (op.game_id().to_string(), index))
        .collect()
}
