//! Host catalog read from a JSON export file
//!
//! The CLI has no host application to ask, so it reads the catalog the host
//! exported:
//!
//! ```json
//! {
//!   "games": [
//!     { "id": "…", "externalId": "440", "pluginId": "steam", "name": "Portal",
//!       "playtimeSeconds": 3600, "playCount": 2 }
//!   ],
//!   "achievements": {
//!     "<game id>": [ { "name": "Tutorial", "isUnlocked": true } ]
//!   }
//! }
//! ```
//!
//! The file is re-read on every call so a long-running `playlog run` picks
//! up new exports without a restart.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use playlog_core::domain::AchievementDto;
use playlog_core::ports::{AchievementCounts, IAchievementProvider, IGameLibrary, LibraryGame};

/// Contents of an export file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LibraryExport {
    games: Vec<LibraryGame>,
    achievements: HashMap<String, Vec<AchievementDto>>,
}

/// [`IGameLibrary`] and [`IAchievementProvider`] over an export file
#[derive(Debug, Clone)]
pub struct LibraryFile {
    path: Option<PathBuf>,
}

impl LibraryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A library with no games, used when no export file was given
    pub fn empty() -> Self {
        Self { path: None }
    }

    async fn read(&self) -> Result<LibraryExport> {
        let Some(path) = &self.path else {
            return Ok(LibraryExport::default());
        };
        read_export(path).await
    }

    /// Achievement list of `game`, or `None` if the export has none for it
    async fn achievements_of(&self, game: &LibraryGame) -> Option<Vec<AchievementDto>> {
        match self.read().await {
            Ok(mut export) => export.achievements.remove(&game.id),
            Err(e) => {
                warn!(error = %e, "Failed to read achievements from export");
                None
            }
        }
    }
}

async fn read_export(path: &Path) -> Result<LibraryExport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read library export {}", path.display()))?;
    let export: LibraryExport = serde_json::from_str(&content)
        .with_context(|| format!("Invalid library export {}", path.display()))?;
    debug!(
        path = %path.display(),
        games = export.games.len(),
        with_achievements = export.achievements.len(),
        "Read library export"
    );
    Ok(export)
}

#[async_trait::async_trait]
impl IGameLibrary for LibraryFile {
    async fn games(&self) -> Result<Vec<LibraryGame>> {
        Ok(self.read().await?.games)
    }
}

#[async_trait::async_trait]
impl IAchievementProvider for LibraryFile {
    fn name(&self) -> &str {
        "export-file"
    }

    async fn counts(&self, game: &LibraryGame) -> Option<AchievementCounts> {
        let list = self.achievements_of(game).await?;
        Some(AchievementCounts {
            unlocked: list.iter().filter(|a| a.is_unlocked).count() as u32,
            total: list.len() as u32,
        })
    }

    async fn achievements(&self, game: &LibraryGame) -> Option<Vec<AchievementDto>> {
        self.achievements_of(game).await
    }
}
