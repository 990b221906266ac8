//! Snapshot store
//!
//! Owns the library and achievement baselines. Readers always get copies,
//! so iterating a baseline is never affected by a concurrent writer.
//!
//! Every mutation is applied to a copy, persisted, and only then committed
//! in memory: a failed save leaves the previous baseline in place.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use playlog_core::domain::{GameAchievementSnapshot, GameSnapshot, SnapshotBaseline};
use playlog_core::ports::IStateStore;

/// Durable owner of the two baselines
pub struct SnapshotStore {
    store: Arc<dyn IStateStore>,
    baseline: Mutex<SnapshotBaseline>,
}

impl SnapshotStore {
    pub async fn load(store: Arc<dyn IStateStore>) -> anyhow::Result<Self> {
        let baseline = store.load_baseline().await?;
        debug!(
            library = baseline.library.len(),
            achievements = baseline.achievements.len(),
            "Loaded snapshot baseline"
        );
        Ok(Self {
            store,
            baseline: Mutex::new(baseline),
        })
    }

    /// Applies `change` to a copy of the baseline, persists it, then commits it
    async fn mutate<F>(&self, change: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut SnapshotBaseline),
    {
        let mut current = self.baseline.lock().await;
        let mut next = current.clone();
        change(&mut next);
        self.store.save_baseline(&next).await?;
        *current = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Independent copy of the library baseline
    pub async fn library_snapshot(&self) -> HashMap<String, GameSnapshot> {
        self.baseline.lock().await.library.clone()
    }

    /// Independent copy of the achievement baseline
    pub async fn achievements_snapshot(&self) -> HashMap<String, GameAchievementSnapshot> {
        self.baseline.lock().await.achievements.clone()
    }

    pub async fn has_library_baseline(&self) -> bool {
        self.baseline.lock().await.has_library_baseline()
    }

    pub async fn has_achievements_baseline(&self) -> bool {
        self.baseline.lock().await.has_achievements_baseline()
    }

    pub async fn library_baseline_at(&self) -> Option<DateTime<Utc>> {
        self.baseline.lock().await.library_baseline_at
    }

    pub async fn achievements_baseline_at(&self) -> Option<DateTime<Utc>> {
        self.baseline.lock().await.achievements_baseline_at
    }

    /// Number of entries in the (library, achievement) baselines
    pub async fn sizes(&self) -> (usize, usize) {
        let baseline = self.baseline.lock().await;
        (baseline.library.len(), baseline.achievements.len())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Replaces the library baseline wholesale and stamps it
    pub async fn update_library_snapshot(
        &self,
        library: HashMap<String, GameSnapshot>,
    ) -> anyhow::Result<()> {
        let count = library.len();
        self.mutate(move |b| {
            b.library = library;
            b.library_baseline_at = Some(Utc::now());
        })
        .await?;
        debug!(count, "Library baseline replaced");
        Ok(())
    }

    /// Replaces the achievement baseline wholesale and stamps it
    pub async fn update_achievements_snapshot(
        &self,
        achievements: HashMap<String, GameAchievementSnapshot>,
    ) -> anyhow::Result<()> {
        let count = achievements.len();
        self.mutate(move |b| {
            b.achievements = achievements;
            b.achievements_baseline_at = Some(Utc::now());
        })
        .await?;
        debug!(count, "Achievement baseline replaced");
        Ok(())
    }

    /// Upserts and deletes library entries, leaving the timestamp alone
    pub async fn apply_library_diff(
        &self,
        upserts: Vec<(String, GameSnapshot)>,
        removed: &[String],
    ) -> anyhow::Result<()> {
        self.mutate(|b| {
            b.library.extend(upserts);
            for id in removed {
                b.library.remove(id);
            }
        })
        .await
    }

    /// Upserts and deletes achievement entries, leaving the timestamp alone
    pub async fn apply_achievements_diff(
        &self,
        upserts: Vec<(String, GameAchievementSnapshot)>,
        removed: &[String],
    ) -> anyhow::Result<()> {
        self.mutate(|b| {
            b.achievements.extend(upserts);
            for id in removed {
                b.achievements.remove(id);
            }
        })
        .await
    }

    /// Forgets the library baseline; the next sync must be full
    pub async fn clear_library(&self) -> anyhow::Result<()> {
        self.mutate(|b| {
            b.library.clear();
            b.library_baseline_at = None;
        })
        .await
    }

    /// Forgets the achievement baseline; the next sync must be full
    pub async fn clear_achievements(&self) -> anyhow::Result<()> {
        self.mutate(|b| {
            b.achievements.clear();
            b.achievements_baseline_at = None;
        })
        .await
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}
