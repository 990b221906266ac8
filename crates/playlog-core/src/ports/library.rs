//! Host collaboration ports (driven/secondary ports)
//!
//! The host application owns the game catalog and whatever add-ons report
//! achievements. This module defines the narrow views the sync engine needs:
//!
//! - [`IGameLibrary`] enumerates catalog items
//! - [`IAchievementProvider`] reports achievement counts and detail for a game
//! - [`CompositeAchievementProvider`] aggregates several providers, first
//!   answer wins

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AchievementDto, GameAchievementsDto, GameDto, GameMetadata};

// ============================================================================
// Catalog items
// ============================================================================

/// A catalog item as the host reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGame {
    pub id: String,
    pub external_id: String,
    pub plugin_id: String,
    pub name: String,
    #[serde(default)]
    pub is_installed: bool,
    #[serde(default)]
    pub playtime_seconds: u64,
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metadata: GameMetadata,
}

impl LibraryGame {
    /// Builds the wire record, folding in achievement counts if known
    pub fn to_dto(&self, counts: Option<AchievementCounts>) -> GameDto {
        GameDto {
            id: self.id.clone(),
            external_id: self.external_id.clone(),
            plugin_id: self.plugin_id.clone(),
            name: self.name.clone(),
            is_installed: self.is_installed,
            playtime_seconds: self.playtime_seconds,
            play_count: self.play_count,
            last_activity: self.last_activity,
            metadata: self.metadata.clone(),
            achievements_unlocked: counts.map(|c| c.unlocked),
            achievements_total: counts.map(|c| c.total),
        }
    }

    /// Builds the achievement record of this game
    pub fn to_achievements_dto(&self, achievements: Vec<AchievementDto>) -> GameAchievementsDto {
        GameAchievementsDto {
            id: self.id.clone(),
            external_id: self.external_id.clone(),
            plugin_id: self.plugin_id.clone(),
            achievements,
        }
    }
}

/// Unlocked/total achievement counts of one game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCounts {
    pub unlocked: u32,
    pub total: u32,
}

// ============================================================================
// IGameLibrary trait
// ============================================================================

/// Port trait for the host game catalog
#[async_trait::async_trait]
pub trait IGameLibrary: Send + Sync {
    /// Enumerates the current catalog
    async fn games(&self) -> anyhow::Result<Vec<LibraryGame>>;

    /// Looks up a single catalog item by its local id
    async fn find_game(&self, id: &str) -> anyhow::Result<Option<LibraryGame>> {
        Ok(self.games().await?.into_iter().find(|game| game.id == id))
    }
}

// ============================================================================
// IAchievementProvider trait
// ============================================================================

/// Port trait for a source of achievement data.
///
/// `None` means "this provider knows nothing about the game", which lets a
/// composite fall through to the next provider.
#[async_trait::async_trait]
pub trait IAchievementProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn counts(&self, game: &LibraryGame) -> Option<AchievementCounts>;

    async fn achievements(&self, game: &LibraryGame) -> Option<Vec<AchievementDto>>;
}

/// Ordered set of providers; the first one that answers wins
#[derive(Clone, Default)]
pub struct CompositeAchievementProvider {
    providers: Vec<Arc<dyn IAchievementProvider>>,
}

impl CompositeAchievementProvider {
    pub fn new(providers: Vec<Arc<dyn IAchievementProvider>>) -> Self {
        Self { providers }
    }

    /// Appends a provider with the lowest priority so far
    pub fn with_provider(mut self, provider: Arc<dyn IAchievementProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for CompositeAchievementProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("CompositeAchievementProvider")
            .field("providers", &names)
            .finish()
    }
}

#[async_trait::async_trait]
impl IAchievementProvider for CompositeAchievementProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn counts(&self, game: &LibraryGame) -> Option<AchievementCounts> {
        for provider in &self.providers {
            if let Some(counts) = provider.counts(game).await {
                return Some(counts);
            }
        }
        None
    }

    async fn achievements(&self, game: &LibraryGame) -> Option<Vec<AchievementDto>> {
        for provider in &self.providers {
            if let Some(achievements) = provider.achievements(game).await {
                return Some(achievements);
            }
        }
        None
    }
}
