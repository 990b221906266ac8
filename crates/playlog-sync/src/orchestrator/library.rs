//! Library sync
//!
//! Per run: cooldown gate, catalog build, hash-match skip, full or diff
//! upload, then acknowledgement handling. A force-full-sync directive drops
//! the baseline and restarts once in full mode with the cooldown gate
//! bypassed.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use playlog_core::domain::{
    compute_library_diff, compute_library_hash, GameDto, GameSnapshot, LibraryDiff, SyncKind,
    SyncMode, SyncOutcome,
};
use playlog_core::ports::{LibraryDiffRequest, LibraryFullRequest};

use super::{AckAction, SyncOrchestrator};

/// Baseline change to commit once the server accepts the upload
enum LibraryCommit {
    Replace(Vec<GameDto>),
    Apply(LibraryDiff),
}

impl SyncOrchestrator {
    /// Synchronizes the game library. Never fails: errors become
    /// [`SyncOutcome::Error`] and leave cursor and baseline untouched.
    #[instrument(skip(self))]
    pub async fn sync_library(&self, mode: SyncMode) -> SyncOutcome {
        match self.run_library_sync(mode).await {
            Ok(outcome) => {
                info!(%outcome, "Library sync finished");
                outcome
            }
            Err(e) => {
                warn!(error = %e, "Library sync failed");
                SyncOutcome::Error
            }
        }
    }

    async fn run_library_sync(&self, requested: SyncMode) -> anyhow::Result<SyncOutcome> {
        let mut mode = requested;
        let mut forced = false;

        loop {
            let cursor = self.state.lock().await.cursor.clone();
            if !forced && cursor.in_cooldown(SyncKind::Library, Utc::now()) {
                debug!(
                    until = ?cursor.cooldown_until(SyncKind::Library),
                    "Library sync in cooldown"
                );
                return Ok(SyncOutcome::Cooldown);
            }

            let catalog = self.catalog().await?;
            let mut games = Vec::with_capacity(catalog.len());
            for game in &catalog {
                let counts = self.achievements.counts(game).await;
                games.push(game.to_dto(counts));
            }
            let (games, hash) = tokio::task::spawn_blocking(move || {
                let hash = compute_library_hash(&games);
                (games, hash)
            })
            .await?;

            let has_baseline = self.snapshots.has_library_baseline().await;
            let last_hash = cursor.last_hash(SyncKind::Library).map(str::to_string);
            if has_baseline && last_hash.as_deref() == Some(hash.as_str()) {
                debug!(%hash, "Library unchanged since last sync");
                return Ok(SyncOutcome::Skipped);
            }
            if mode == SyncMode::Diff && !has_baseline {
                debug!("No library baseline, sending full library");
                mode = SyncMode::Full;
            }

            let install_id = self.install_id().await;
            let count = games.len() as u64;
            let (ack, commit) = match mode {
                SyncMode::Full => {
                    let request = LibraryFullRequest {
                        install_id,
                        library_hash: hash.clone(),
                        games,
                    };
                    info!(games = request.games.len(), "Sending full library");
                    let remote = self.remote.as_ref();
                    let request_ref = &request;
                    let ack = self
                        .call_remote("library full sync", move || {
                            remote.sync_library_full(request_ref)
                        })
                        .await;
                    (ack, LibraryCommit::Replace(request.games))
                }
                SyncMode::Diff => {
                    let baseline = self.snapshots.library_snapshot().await;
                    let diff =
                        tokio::task::spawn_blocking(move || compute_library_diff(&games, &baseline))
                            .await?;
                    let request = LibraryDiffRequest {
                        install_id,
                        base_library_hash: last_hash,
                        library_hash: hash.clone(),
                        added: diff.added.clone(),
                        updated: diff.updated.clone(),
                        removed: diff.removed.clone(),
                    };
                    info!(
                        added = request.added.len(),
                        updated = request.updated.len(),
                        removed = request.removed.len(),
                        "Sending library diff"
                    );
                    let remote = self.remote.as_ref();
                    let request_ref = &request;
                    let ack = self
                        .call_remote("library diff sync", move || {
                            remote.sync_library_diff(request_ref)
                        })
                        .await;
                    (ack, LibraryCommit::Apply(diff))
                }
            };

            let Some(ack) = ack else {
                return Ok(SyncOutcome::Error);
            };

            match self.classify_ack(&ack, Utc::now()) {
                AckAction::ForceFull if forced => {
                    warn!("Server repeated force-full-sync, giving up for this run");
                    return Ok(SyncOutcome::Error);
                }
                AckAction::ForceFull => {
                    info!("Server requested a full library resync");
                    self.snapshots.clear_library().await?;
                    self.update_state(|s| s.cursor.set_last_hash(SyncKind::Library, None))
                        .await?;
                    mode = SyncMode::Full;
                    forced = true;
                }
                AckAction::Cooldown(until) => {
                    self.enter_cooldown(SyncKind::Library, until).await?;
                    return Ok(SyncOutcome::Cooldown);
                }
                AckAction::Reject => {
                    warn!(status = ?ack.status, reason = ?ack.reason, "Server rejected library sync");
                    return Ok(SyncOutcome::Error);
                }
                AckAction::Commit => {
                    self.commit_library(commit).await?;
                    let now = Utc::now();
                    self.update_state(move |s| {
                        s.cursor.set_last_hash(SyncKind::Library, Some(hash));
                        s.cursor.last_sync_at = Some(now);
                        s.cursor.last_sync_count = count;
                        s.cursor.set_cooldown_until(SyncKind::Library, None);
                    })
                    .await?;
                    return Ok(SyncOutcome::Success);
                }
            }
        }
    }

    async fn commit_library(&self, commit: LibraryCommit) -> anyhow::Result<()> {
        match commit {
            LibraryCommit::Replace(games) => {
                let library = tokio::task::spawn_blocking(move || {
                    games
                        .iter()
                        .map(|game| (game.id.clone(), GameSnapshot::from_dto(game)))
                        .collect::<HashMap<_, _>>()
                })
                .await?;
                self.snapshots.update_library_snapshot(library).await
            }
            LibraryCommit::Apply(diff) => {
                self.snapshots
                    .apply_library_diff(diff.snapshot_upserts(), &diff.removed)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use playlog_core::ports::{AckStatus, IStateStore, SyncAck};

    use super::super::testing::{achievement, game, harness, Harness};
    use super::*;

    fn cooldown_ack(until: Option<chrono::DateTime<Utc>>) -> SyncAck {
        SyncAck {
            success: false,
            reason: Some("cooldown_library".to_string()),
            cooldown_expires_at: until,
            ..Default::default()
        }
    }

    fn force_full_ack() -> SyncAck {
        SyncAck {
            success: true,
            status: AckStatus::ForceFullSync,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sync_is_full_and_creates_baseline() {
        let Harness { orchestrator, remote, .. } = harness().await;

        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Success);

        remote.recorded(|r| {
            assert_eq!(r.library_full.len(), 1);
            assert!(r.library_diff.is_empty());
            assert_eq!(r.library_full[0].games.len(), 2);
        });
        assert_eq!(orchestrator.snapshots().sizes().await.0, 2);
        let cursor = orchestrator.install_state().await.cursor;
        assert_eq!(cursor.last_sync_count, 2);
        assert!(cursor.last_library_hash.is_some());
        assert!(cursor.last_sync_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_library_is_skipped() {
        let Harness { orchestrator, remote, .. } = harness().await;
        orchestrator.sync_library(SyncMode::Full).await;

        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Skipped);
        assert_eq!(orchestrator.sync_library(SyncMode::Full).await, SyncOutcome::Skipped);
        remote.recorded(|r| assert_eq!(r.library_full.len() + r.library_diff.len(), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diff_sends_only_changes_with_base_hash() {
        let Harness { orchestrator, remote, library, .. } = harness().await;
        orchestrator.sync_library(SyncMode::Full).await;
        let base_hash = orchestrator.install_state().await.cursor.last_library_hash;

        library.update("g1", |g| g.playtime_seconds += 600);
        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Success);

        remote.recorded(|r| {
            let diff = &r.library_diff[0];
            assert_eq!(diff.base_library_hash, base_hash);
            assert!(diff.added.is_empty());
            assert_eq!(diff.updated.len(), 1);
            assert_eq!(diff.updated[0].id, "g1");
            assert!(diff.removed.is_empty());
        });
        let baseline = orchestrator.snapshots().library_snapshot().await;
        assert_eq!(baseline["g1"].playtime_seconds, 4200);
        assert_ne!(orchestrator.install_state().await.cursor.last_library_hash, base_hash);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_game_leaves_baseline() {
        let Harness { orchestrator, remote, library, .. } = harness().await;
        orchestrator.sync_library(SyncMode::Full).await;

        library.set_games(vec![game("g1", "steam", 3600)]);
        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Success);

        remote.recorded(|r| assert_eq!(r.library_diff[0].removed, vec!["g2".to_string()]));
        assert_eq!(orchestrator.snapshots().sizes().await.0, 1);
        assert_eq!(orchestrator.install_state().await.cursor.last_sync_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_ack_persists_expiry_and_gates_next_run() {
        let Harness { orchestrator, remote, store, .. } = harness().await;
        let until = Utc::now() + Duration::minutes(30);
        remote.push_ack(Some(cooldown_ack(Some(until))));

        assert_eq!(orchestrator.sync_library(SyncMode::Full).await, SyncOutcome::Cooldown);
        let persisted = store.load_install_state().await.unwrap();
        assert_eq!(persisted.cursor.library_cooldown_until, Some(until));
        assert!(!orchestrator.snapshots().has_library_baseline().await);

        // Gated locally, the remote service is not asked again
        assert_eq!(orchestrator.sync_library(SyncMode::Full).await, SyncOutcome::Cooldown);
        remote.recorded(|r| assert_eq!(r.library_full.len(), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_without_expiry_uses_default() {
        let Harness { orchestrator, remote, .. } = harness().await;
        remote.push_ack(Some(cooldown_ack(None)));
        let before = Utc::now();

        orchestrator.sync_library(SyncMode::Full).await;

        let until = orchestrator
            .install_state()
            .await
            .cursor
            .library_cooldown_until
            .unwrap();
        assert!(until >= before + Duration::seconds(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_full_sync_resends_full_once() {
        let Harness { orchestrator, remote, library, .. } = harness().await;
        orchestrator.sync_library(SyncMode::Full).await;
        library.update("g2", |g| g.play_count = 4);

        remote.push_ack(Some(force_full_ack()));
        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Success);

        remote.recorded(|r| {
            assert_eq!(r.library_diff.len(), 1);
            assert_eq!(r.library_full.len(), 2);
        });
        let baseline = orchestrator.snapshots().library_snapshot().await;
        assert_eq!(baseline["g2"].play_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_force_full_sync_is_error() {
        let Harness { orchestrator, remote, .. } = harness().await;
        remote.push_ack(Some(force_full_ack()));
        remote.push_ack(Some(force_full_ack()));

        assert_eq!(orchestrator.sync_library(SyncMode::Full).await, SyncOutcome::Error);
        remote.recorded(|r| assert_eq!(r.library_full.len(), 2));
        assert!(!orchestrator.snapshots().has_library_baseline().await);
        assert!(orchestrator
            .install_state()
            .await
            .cursor
            .last_library_hash
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_leaves_state_untouched() {
        let Harness { orchestrator, remote, library, .. } = harness().await;
        orchestrator.sync_library(SyncMode::Full).await;
        let before = orchestrator.install_state().await.cursor;
        let baseline = orchestrator.snapshots().library_snapshot().await;

        library.update("g1", |g| g.playtime_seconds = 1);
        remote.fail_syncs(true);
        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Error);

        remote.fail_syncs(false);
        remote.push_ack(Some(SyncAck::default()));
        assert_eq!(orchestrator.sync_library(SyncMode::Diff).await, SyncOutcome::Error);

        assert_eq!(orchestrator.install_state().await.cursor, before);
        assert_eq!(orchestrator.snapshots().library_snapshot().await, baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_achievement_counts_are_folded_in() {
        let Harness { orchestrator, remote, achievements, .. } = harness().await;
        achievements.set("g1", vec![achievement("A", true), achievement("B", false)]);

        orchestrator.sync_library(SyncMode::Full).await;

        remote.recorded(|r| {
            let g1 = r.library_full[0].games.iter().find(|g| g.id == "g1").unwrap();
            assert_eq!(g1.achievements_unlocked, Some(1));
            assert_eq!(g1.achievements_total, Some(2));
            let g2 = r.library_full[0].games.iter().find(|g| g.id == "g2").unwrap();
            assert_eq!(g2.achievements_total, None);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_disallowed_sources_are_not_sent() {
        let Harness { orchestrator, remote, .. } = harness().await;
        remote.set_allowed_sources(vec!["GOG".to_string()]);

        orchestrator.sync_library(SyncMode::Full).await;

        remote.recorded(|r| {
            let ids: Vec<_> = r.library_full[0].games.iter().map(|g| g.id.as_str()).collect();
            assert_eq!(ids, vec!["g2"]);
        });
    }
}
