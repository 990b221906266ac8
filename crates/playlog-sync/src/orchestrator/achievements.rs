//! Achievement sync
//!
//! Same state machine as the library sync, with its own cooldown and hash.
//! A game that stops reporting achievements while still in the catalog is
//! sent as an explicit clear (empty list); a game that left the catalog is
//! sent as removed.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use playlog_core::domain::{
    compute_achievement_hash, compute_achievements_diff, AchievementsDiff, GameAchievementSnapshot,
    GameAchievementsDto, GameDto, SyncKind, SyncMode, SyncOutcome,
};
use playlog_core::ports::{AchievementsDiffRequest, AchievementsFullRequest};

use super::{AckAction, SyncOrchestrator};

enum AchievementsCommit {
    Replace(Vec<GameAchievementsDto>),
    Apply(AchievementsDiff),
}

impl SyncOrchestrator {
    /// Synchronizes achievement data. Never fails: errors become
    /// [`SyncOutcome::Error`] and leave cursor and baseline untouched.
    #[instrument(skip(self))]
    pub async fn sync_achievements(&self, mode: SyncMode) -> SyncOutcome {
        match self.run_achievements_sync(mode).await {
            Ok(outcome) => {
                info!(%outcome, "Achievement sync finished");
                outcome
            }
            Err(e) => {
                warn!(error = %e, "Achievement sync failed");
                SyncOutcome::Error
            }
        }
    }

    /// Achievement records of every catalog game a provider knows, plus the
    /// plain catalog records used to tell clears from removals
    async fn collect_achievements(&self) -> anyhow::Result<(Vec<GameAchievementsDto>, Vec<GameDto>)> {
        let catalog = self.catalog().await?;
        let mut current = Vec::new();
        for game in &catalog {
            if let Some(list) = self.achievements.achievements(game).await {
                current.push(game.to_achievements_dto(list));
            }
        }
        let library = catalog.iter().map(|game| game.to_dto(None)).collect();
        debug!(
            games = catalog.len(),
            with_achievements = current.len(),
            provider = self.achievements.name(),
            "Collected achievement data"
        );
        Ok((current, library))
    }

    async fn run_achievements_sync(&self, requested: SyncMode) -> anyhow::Result<SyncOutcome> {
        let mut mode = requested;
        let mut forced = false;

        loop {
            let cursor = self.state.lock().await.cursor.clone();
            if !forced && cursor.in_cooldown(SyncKind::Achievements, Utc::now()) {
                debug!(
                    until = ?cursor.cooldown_until(SyncKind::Achievements),
                    "Achievement sync in cooldown"
                );
                return Ok(SyncOutcome::Cooldown);
            }

            let (current, library) = self.collect_achievements().await?;
            let (current, hash) = tokio::task::spawn_blocking(move || {
                let hash = compute_achievement_hash(&current);
                (current, hash)
            })
            .await?;

            let has_baseline = self.snapshots.has_achievements_baseline().await;
            let last_hash = cursor.last_hash(SyncKind::Achievements).map(str::to_string);
            if has_baseline && last_hash.as_deref() == Some(hash.as_str()) {
                debug!(%hash, "Achievements unchanged since last sync");
                return Ok(SyncOutcome::Skipped);
            }
            if mode == SyncMode::Diff && !has_baseline {
                debug!("No achievement baseline, sending everything");
                mode = SyncMode::Full;
            }

            let install_id = self.install_id().await;
            let (ack, commit) = match mode {
                SyncMode::Full => {
                    let request = AchievementsFullRequest {
                        install_id,
                        achievement_hash: hash.clone(),
                        games: current,
                    };
                    info!(games = request.games.len(), "Sending all achievements");
                    let remote = self.remote.as_ref();
                    let request_ref = &request;
                    let ack = self
                        .call_remote("achievements full sync", move || {
                            remote.sync_achievements_full(request_ref)
                        })
                        .await;
                    (ack, AchievementsCommit::Replace(request.games))
                }
                SyncMode::Diff => {
                    let baseline = self.snapshots.achievements_snapshot().await;
                    let diff = tokio::task::spawn_blocking(move || {
                        compute_achievements_diff(&current, &baseline, &library)
                    })
                    .await?;
                    let request = AchievementsDiffRequest {
                        install_id,
                        base_achievement_hash: last_hash,
                        achievement_hash: hash.clone(),
                        added: diff.added.clone(),
                        updated: diff.updated.clone(),
                        removed: diff.removed.clone(),
                    };
                    info!(
                        added = request.added.len(),
                        updated = request.updated.len(),
                        removed = request.removed.len(),
                        "Sending achievement diff"
                    );
                    let remote = self.remote.as_ref();
                    let request_ref = &request;
                    let ack = self
                        .call_remote("achievements diff sync", move || {
                            remote.sync_achievements_diff(request_ref)
                        })
                        .await;
                    (ack, AchievementsCommit::Apply(diff))
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
                    info!("Server requested a full achievement resync");
                    self.snapshots.clear_achievements().await?;
                    self.update_state(|s| s.cursor.set_last_hash(SyncKind::Achievements, None))
                        .await?;
                    mode = SyncMode::Full;
                    forced = true;
                }
                AckAction::Cooldown(until) => {
                    self.enter_cooldown(SyncKind::Achievements, until).await?;
                    return Ok(SyncOutcome::Cooldown);
                }
                AckAction::Reject => {
                    warn!(
                        status = ?ack.status,
                        reason = ?ack.reason,
                        "Server rejected achievement sync"
                    );
                    return Ok(SyncOutcome::Error);
                }
                AckAction::Commit => {
                    self.commit_achievements(commit).await?;
                    let now = Utc::now();
                    self.update_state(move |s| {
                        s.cursor.set_last_hash(SyncKind::Achievements, Some(hash));
                        s.cursor.last_sync_at = Some(now);
                        s.cursor.set_cooldown_until(SyncKind::Achievements, None);
                    })
                    .await?;
                    return Ok(SyncOutcome::Success);
                }
            }
        }
    }

    async fn commit_achievements(&self, commit: AchievementsCommit) -> anyhow::Result<()> {
        match commit {
            // Cleared games carry nothing worth remembering
            AchievementsCommit::Replace(games) => {
                let baseline = games
                    .iter()
                    .filter(|game| !game.achievements.is_empty())
                    .map(|game| (game.id.clone(), GameAchievementSnapshot::from_dto(game)))
                    .collect();
                self.snapshots.update_achievements_snapshot(baseline).await
            }
            AchievementsCommit::Apply(diff) => {
                let (upserts, removed) = diff.snapshot_changes();
                self.snapshots
                    .apply_achievements_diff(upserts, &removed)
                    .await
            }
        }
    }
}
