//! Snapshot baselines
//!
//! A baseline is the last state the server acknowledged for one catalog
//! dimension (library or achievements). Diffs are computed against it.
//!
//! Baseline validity is decided by the `*_baseline_at` timestamps, never by
//! map size: an empty catalog is a legitimate, fully synced baseline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::{AchievementDto, GameAchievementsDto, GameDto};
use super::hashing::{compute_game_metadata_hash, format_timestamp};

/// Canonical per-game record stored in the library baseline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub external_id: String,
    pub plugin_id: String,
    pub playtime_seconds: u64,
    pub play_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
    pub metadata_hash: String,
    #[serde(default)]
    pub achievements_unlocked: Option<u32>,
    #[serde(default)]
    pub achievements_total: Option<u32>,
}

impl GameSnapshot {
    /// Builds the snapshot of a game, computing its metadata hash
    pub fn from_dto(game: &GameDto) -> Self {
        Self::with_metadata_hash(game, compute_game_metadata_hash(game))
    }

    /// Builds the snapshot of a game with an already computed metadata hash
    pub fn with_metadata_hash(game: &GameDto, metadata_hash: String) -> Self {
        Self {
            external_id: game.external_id.clone(),
            plugin_id: game.plugin_id.clone(),
            playtime_seconds: game.playtime_seconds,
            play_count: game.play_count,
            last_activity: game.last_activity,
            metadata_hash,
            achievements_unlocked: game.achievements_unlocked,
            achievements_total: game.achievements_total,
        }
    }

    /// Returns true if `current` differs in an activity field or in metadata.
    ///
    /// Last activity is compared in canonical form, so sub-second noise that
    /// would not change the library hash is not reported as an update.
    pub fn has_changed(&self, current: &GameSnapshot) -> bool {
        self.playtime_seconds != current.playtime_seconds
            || self.play_count != current.play_count
            || format_timestamp(self.last_activity.as_ref())
                != format_timestamp(current.last_activity.as_ref())
            || self.metadata_hash != current.metadata_hash
    }
}

/// One achievement as stored in the achievement baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSnapshotItem {
    pub name: String,
    pub is_unlocked: bool,
    #[serde(default)]
    pub date_unlocked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rarity_percent: Option<f64>,
}

impl From<&AchievementDto> for AchievementSnapshotItem {
    fn from(dto: &AchievementDto) -> Self {
        Self {
            name: dto.name.clone(),
            is_unlocked: dto.is_unlocked,
            date_unlocked: dto.date_unlocked,
            rarity_percent: dto.rarity_percent,
        }
    }
}

/// All achievements of one game as stored in the achievement baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAchievementSnapshot {
    pub external_id: String,
    pub achievements: Vec<AchievementSnapshotItem>,
}

impl GameAchievementSnapshot {
    pub fn from_dto(game: &GameAchievementsDto) -> Self {
        Self {
            external_id: game.external_id.clone(),
            achievements: game.achievements.iter().map(Into::into).collect(),
        }
    }
}

/// The two independent baselines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotBaseline {
    pub library: HashMap<String, GameSnapshot>,
    pub achievements: HashMap<String, GameAchievementSnapshot>,
    pub library_baseline_at: Option<DateTime<Utc>>,
    pub achievements_baseline_at: Option<DateTime<Utc>>,
}

impl SnapshotBaseline {
    pub fn has_library_baseline(&self) -> bool {
        self.library_baseline_at.is_some()
    }

    pub fn has_achievements_baseline(&self) -> bool {
        self.achievements_baseline_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn game() -> GameDto {
        GameDto {
            id: "g1".to_string(),
            external_id: "440".to_string(),
            plugin_id: "steam".to_string(),
            name: "Portal".to_string(),
            playtime_seconds: 60,
            play_count: 1,
            last_activity: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_unchanged_for_same_game() {
        let a = GameSnapshot::from_dto(&game());
        let b = GameSnapshot::from_dto(&game());
        assert!(!a.has_changed(&b));
    }

    #[test]
    fn test_snapshot_detects_activity_change() {
        let before = GameSnapshot::from_dto(&game());
        let mut g = game();
        g.play_count = 2;
        assert!(before.has_changed(&GameSnapshot::from_dto(&g)));
    }

    #[test]
    fn test_snapshot_detects_metadata_change() {
        let before = GameSnapshot::from_dto(&game());
        let mut g = game();
        g.metadata.is_hidden = true;
        assert!(before.has_changed(&GameSnapshot::from_dto(&g)));
    }

    #[test]
    fn test_snapshot_ignores_sub_second_activity_noise() {
        let before = GameSnapshot::from_dto(&game());
        let mut g = game();
        g.last_activity = g
            .last_activity
            .map(|ts| ts + chrono::Duration::milliseconds(10));
        assert!(!before.has_changed(&GameSnapshot::from_dto(&g)));
    }

    #[test]
    fn test_empty_baseline_has_no_baselines() {
        let baseline = SnapshotBaseline::default();
        assert!(!baseline.has_library_baseline());
        assert!(!baseline.has_achievements_baseline());
    }

    #[test]
    fn test_baseline_validity_follows_timestamp_not_size() {
        let baseline = SnapshotBaseline {
            library_baseline_at: Some(Utc::now()),
            ..Default::default()
        };
        assert!(baseline.library.is_empty());
        assert!(baseline.has_library_baseline());
    }
}
