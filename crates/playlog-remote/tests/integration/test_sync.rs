//! Library, achievement and allowed-source endpoints

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use playlog_core::domain::{GameAchievementsDto, GameDto};
use playlog_core::ports::{
    AchievementsDiffRequest, AchievementsFullRequest, AckStatus, IRemoteClient,
    LibraryDiffRequest, LibraryFullRequest,
};

use crate::common::{self, INSTALL_ID};

fn game(id: &str) -> GameDto {
    GameDto {
        id: id.to_string(),
        external_id: format!("ext-{id}"),
        plugin_id: "steam".to_string(),
        name: format!("Game {id}"),
        playtime_seconds: 120,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_library_full_posts_games() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/sync/library"))
        .and(header("X-Install-Id", INSTALL_ID))
        .and(body_partial_json(json!({ "installId": INSTALL_ID, "libraryHash": "abc" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "status": "queued" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = LibraryFullRequest {
        install_id: INSTALL_ID.to_string(),
        library_hash: "abc".to_string(),
        games: vec![game("a"), game("b")],
    };
    let ack = client.sync_library_full(&request).await.unwrap().unwrap();
    assert!(ack.is_accepted());
}

#[tokio::test]
async fn test_library_diff_force_full_sync() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/sync/library/diff"))
        .and(body_partial_json(json!({
            "baseLibraryHash": "old",
            "removed": ["gone"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "force-full-sync"
        })))
        .mount(&server)
        .await;

    let request = LibraryDiffRequest {
        install_id: INSTALL_ID.to_string(),
        base_library_hash: Some("old".to_string()),
        library_hash: "new".to_string(),
        added: vec![],
        updated: vec![game("a")],
        removed: vec!["gone".to_string()],
    };
    let ack = client.sync_library_diff(&request).await.unwrap().unwrap();
    assert!(ack.is_force_full_sync());
    assert!(!ack.is_accepted());
}

#[tokio::test]
async fn test_cooldown_ack_carries_expiry() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/sync/achievements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "reason": "cooldown_active",
            "cooldownExpiresAt": "2024-05-01T19:00:00Z"
        })))
        .mount(&server)
        .await;

    let request = AchievementsFullRequest {
        install_id: INSTALL_ID.to_string(),
        achievement_hash: "h".to_string(),
        games: vec![],
    };
    let ack = client
        .sync_achievements_full(&request)
        .await
        .unwrap()
        .unwrap();
    assert!(ack.is_cooldown());
    assert_eq!(
        ack.cooldown_expires_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_achievements_diff_sends_clear_record() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/sync/achievements/diff"))
        .and(body_partial_json(json!({
            "updated": [{ "id": "g1", "achievements": [] }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "status": "skipped" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = AchievementsDiffRequest {
        install_id: INSTALL_ID.to_string(),
        base_achievement_hash: Some("h0".to_string()),
        achievement_hash: "h1".to_string(),
        added: vec![],
        updated: vec![GameAchievementsDto::cleared("g1", "ext-g1", "steam")],
        removed: vec![],
    };
    let ack = client
        .sync_achievements_diff(&request)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ack.status, AckStatus::Skipped);
    assert!(ack.is_accepted());
}

#[tokio::test]
async fn test_allowed_sources() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/sync/sources"))
        .and(header("X-Install-Id", INSTALL_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sources": ["CB91DFC9-B977-43BF-8E70-55F46E410FAB", "gog"]
        })))
        .mount(&server)
        .await;

    let sources = client.get_allowed_sources().await.unwrap().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1], "gog");
}

#[tokio::test]
async fn test_allowed_sources_empty_body_is_none() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/sync/sources"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client.get_allowed_sources().await.unwrap().is_none());
}
