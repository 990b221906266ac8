//! Canonical hashing of catalog and achievement state
//!
//! The server computes the same hashes independently, so every formatting
//! rule here is part of the wire contract:
//!
//! - Timestamps render in UTC as `YYYY-MM-DDTHH:MM:SSZ`; absent timestamps
//!   render as the empty string.
//! - List fields are comma-joined in their original order. `None` and an
//!   empty list render identically.
//! - Booleans render as `1` / `0`, numbers as decimal, absent numbers as "".
//! - Aggregate hashes sort per-game keys ordinally (byte-wise) and feed
//!   `key|` for each key into a single SHA-256. Digests are lowercase hex.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::game::{GameAchievementsDto, GameDto};

/// Renders a timestamp in the canonical second-precision UTC form.
pub fn format_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Lowercase hex SHA-256 of a UTF-8 string.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

fn join_list(list: Option<&Vec<String>>) -> String {
    list.map(|items| items.join(",")).unwrap_or_default()
}

fn optional<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Computes the metadata hash of a single game.
///
/// Covers every descriptive field in a fixed order and excludes playtime,
/// play count and last activity.
pub fn compute_game_metadata_hash(game: &GameDto) -> String {
    let m = &game.metadata;
    let fields = [
        game.name.clone(),
        m.completion_status_id.clone().unwrap_or_default(),
        m.completion_status_name.clone().unwrap_or_default(),
        flag(game.is_installed).to_string(),
        join_list(m.genres.as_ref()),
        join_list(m.developers.as_ref()),
        join_list(m.publishers.as_ref()),
        join_list(m.tags.as_ref()),
        join_list(m.features.as_ref()),
        join_list(m.platforms.as_ref()),
        join_list(m.series.as_ref()),
        join_list(m.categories.as_ref()),
        m.release_date.clone().unwrap_or_default(),
        optional(m.release_year),
        optional(m.user_score),
        optional(m.critic_score),
        optional(m.community_score),
        m.source_name.clone().unwrap_or_default(),
        flag(m.is_favorite).to_string(),
        flag(m.is_hidden).to_string(),
        format_timestamp(m.date_added.as_ref()),
        format_timestamp(m.modified.as_ref()),
        optional(game.achievements_unlocked),
        optional(game.achievements_total),
    ];

    sha256_hex(&fields.join("|"))
}

/// Builds the library hash key of one game: `id:playtime:playCount:lastActivity:metadataHash`.
pub fn library_hash_key(game: &GameDto, metadata_hash: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        game.id,
        game.playtime_seconds,
        game.play_count,
        format_timestamp(game.last_activity.as_ref()),
        metadata_hash
    )
}

/// Builds the achievement hash key of one game:
/// `id:achievementCount:unlockedCount:sha256(sortedNames)`.
pub fn achievement_hash_key(game: &GameAchievementsDto) -> String {
    let mut names: Vec<&str> = game.achievements.iter().map(|a| a.name.as_str()).collect();
    names.sort_unstable();

    format!(
        "{}:{}:{}:{}",
        game.id,
        game.achievements.len(),
        game.unlocked_count(),
        sha256_hex(&names.join(","))
    )
}

fn hash_sorted_keys(mut keys: Vec<String>) -> String {
    // String ordering is byte-wise, which is the ordinal order the server uses.
    keys.sort_unstable();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}

/// Computes the order-independent hash of the whole library.
pub fn compute_library_hash(games: &[GameDto]) -> String {
    let keys = games
        .iter()
        .map(|game| library_hash_key(game, &compute_game_metadata_hash(game)))
        .collect();
    hash_sorted_keys(keys)
}

/// Computes the order-independent hash of all achievement data.
pub fn compute_achievement_hash(games: &[GameAchievementsDto]) -> String {
    let keys = games.iter().map(achievement_hash_key).collect();
    hash_sorted_keys(keys)
}
