//! Diff computation against a stored baseline
//!
//! Classification rules:
//! - **added**: present now, absent from the baseline
//! - **updated**: present in both, but an activity field or the metadata hash differs
//! - **removed**: present in the baseline, absent now
//!
//! Unchanged items are omitted entirely. Output order follows the input
//! order for added/updated and sorted ids for removed, so payloads are stable.

use std::collections::{HashMap, HashSet};

use super::game::{GameAchievementsDto, GameDto};
use super::snapshot::{GameAchievementSnapshot, GameSnapshot};

// ============================================================================
// Library diff
// ============================================================================

/// Delta between the current library and the library baseline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryDiff {
    pub added: Vec<GameDto>,
    pub updated: Vec<GameDto>,
    pub removed: Vec<String>,
}

impl LibraryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total number of changed items
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Baseline upserts implied by this diff once acknowledged
    pub fn snapshot_upserts(&self) -> Vec<(String, GameSnapshot)> {
        self.added
            .iter()
            .chain(self.updated.iter())
            .map(|game| (game.id.clone(), GameSnapshot::from_dto(game)))
            .collect()
    }
}

/// Classifies the current library against the baseline map
pub fn compute_library_diff(
    current: &[GameDto],
    baseline: &HashMap<String, GameSnapshot>,
) -> LibraryDiff {
    let mut diff = LibraryDiff::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

    for game in current {
        seen.insert(game.id.as_str());
        match baseline.get(&game.id) {
            None => diff.added.push(game.clone()),
            Some(previous) => {
                if previous.has_changed(&GameSnapshot::from_dto(game)) {
                    diff.updated.push(game.clone());
                }
            }
        }
    }

    diff.removed = baseline
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .cloned()
        .collect();
    diff.removed.sort_unstable();

    diff
}

// ============================================================================
// Achievement diff
// ============================================================================

/// Delta between current achievement data and the achievement baseline
///
/// `updated` may contain explicit empty records: those instruct the server
/// to clear achievements of a game that no longer reports any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AchievementsDiff {
    pub added: Vec<GameAchievementsDto>,
    pub updated: Vec<GameAchievementsDto>,
    /// Games that vanished from the catalog entirely
    pub removed: Vec<String>,
}

impl AchievementsDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Baseline changes implied by this diff once acknowledged.
    ///
    /// Cleared games leave the baseline alongside vanished ones, so a clear
    /// is sent once and not repeated on every later diff.
    pub fn snapshot_changes(&self) -> (Vec<(String, GameAchievementSnapshot)>, Vec<String>) {
        let mut upserts = Vec::new();
        let mut removed = self.removed.clone();

        for game in self.added.iter().chain(self.updated.iter()) {
            if game.achievements.is_empty() {
                removed.push(game.id.clone());
            } else {
                upserts.push((game.id.clone(), GameAchievementSnapshot::from_dto(game)));
            }
        }

        (upserts, removed)
    }
}

/// Classifies current achievement data against the baseline map.
///
/// `library` is the full current catalog; it tells a game that stopped
/// reporting achievements (explicit clear) apart from a game that left the
/// catalog (removed).
pub fn compute_achievements_diff(
    current: &[GameAchievementsDto],
    baseline: &HashMap<String, GameAchievementSnapshot>,
    library: &[GameDto],
) -> AchievementsDiff {
    let mut diff = AchievementsDiff::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

    for game in current {
        seen.insert(game.id.as_str());
        match baseline.get(&game.id) {
            None => {
                if !game.achievements.is_empty() {
                    diff.added.push(game.clone());
                }
            }
            Some(previous) => {
                if *previous != GameAchievementSnapshot::from_dto(game) {
                    diff.updated.push(game.clone());
                }
            }
        }
    }

    let in_library: HashMap<&str, &GameDto> =
        library.iter().map(|game| (game.id.as_str(), game)).collect();

    let mut missing: Vec<&String> = baseline
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .collect();
    missing.sort_unstable();

    for id in missing {
        match in_library.get(id.as_str()) {
            Some(game) => diff.updated.push(GameAchievementsDto::cleared(
                id.clone(),
                game.external_id.clone(),
                game.plugin_id.clone(),
            )),
            None => diff.removed.push(id.clone()),
        }
    }

    diff
}
