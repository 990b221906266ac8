//! Per-game catalog and achievement records
//!
//! [`GameDto`] is the canonical per-game record that is hashed, diffed and
//! sent to the server. [`GameAchievementsDto`] carries the per-achievement
//! detail for a single game.
//!
//! All types serialize with camelCase keys to match the server contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata for a catalog item.
///
/// Every field here participates in the metadata hash. Activity fields
/// (playtime, play count, last activity) deliberately live on [`GameDto`]
/// instead, because they are folded into the library hash key separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameMetadata {
    pub completion_status_id: Option<String>,
    pub completion_status_name: Option<String>,
    pub genres: Option<Vec<String>>,
    pub developers: Option<Vec<String>>,
    pub publishers: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub series: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    /// Release date as reported by the host (e.g. `2020-05-01`)
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub user_score: Option<i32>,
    pub critic_score: Option<i32>,
    pub community_score: Option<i32>,
    /// Name of the library source (Steam, GOG, ...)
    pub source_name: Option<String>,
    pub is_favorite: bool,
    pub is_hidden: bool,
    pub date_added: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Canonical per-game record sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDto {
    /// Stable local identifier of the catalog item
    pub id: String,
    /// Identifier of the game within its source (store app id, etc.)
    pub external_id: String,
    /// Identifier of the library plugin that owns the game
    pub plugin_id: String,
    pub name: String,
    pub is_installed: bool,
    pub playtime_seconds: u64,
    pub play_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metadata: GameMetadata,
    pub achievements_unlocked: Option<u32>,
    pub achievements_total: Option<u32>,
}

/// A single achievement of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDto {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_unlocked: bool,
    #[serde(default)]
    pub date_unlocked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rarity_percent: Option<f64>,
}

/// All achievements reported for one game.
///
/// An empty `achievements` list is meaningful on the wire: it tells the
/// server to clear whatever it previously stored for the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAchievementsDto {
    /// Stable local identifier of the catalog item
    pub id: String,
    pub external_id: String,
    pub plugin_id: String,
    pub achievements: Vec<AchievementDto>,
}

impl GameAchievementsDto {
    /// Creates the explicit "clear" record for a game that no longer reports achievements
    pub fn cleared(
        id: impl Into<String>,
        external_id: impl Into<String>,
        plugin_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            plugin_id: plugin_id.into(),
            achievements: Vec::new(),
        }
    }

    /// Number of unlocked achievements
    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.is_unlocked).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_dto_serializes_flat_camel_case() {
        let game = GameDto {
            id: "g1".to_string(),
            external_id: "440".to_string(),
            plugin_id: "steam".to_string(),
            name: "Team Fortress 2".to_string(),
            playtime_seconds: 3600,
            metadata: GameMetadata {
                genres: Some(vec!["Action".to_string()]),
                is_favorite: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["externalId"], "440");
        assert_eq!(json["playtimeSeconds"], 3600);
        assert_eq!(json["genres"][0], "Action");
        assert_eq!(json["isFavorite"], true);

        let back: GameDto = serde_json::from_value(json).unwrap();
        assert_eq!(back, game);
    }

    #[test]
    fn test_unlocked_count() {
        let game = GameAchievementsDto {
            id: "g1".to_string(),
            achievements: vec![
                AchievementDto {
                    name: "A".to_string(),
                    is_unlocked: true,
                    ..Default::default()
                },
                AchievementDto {
                    name: "B".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(game.unlocked_count(), 1);
    }

    #[test]
    fn test_cleared_has_no_achievements() {
        let cleared = GameAchievementsDto::cleared("g1", "440", "steam");
        assert!(cleared.achievements.is_empty());
        assert_eq!(cleared.external_id, "440");
    }
}
