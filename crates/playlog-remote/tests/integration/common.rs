//! Shared helpers: mock server plus a client pointed at it

use std::time::Duration;

use chrono::{TimeZone, Utc};
use wiremock::MockServer;

use playlog_core::domain::{FinishPayload, StartPayload};
use playlog_remote::HttpRemoteClient;

pub const INSTALL_ID: &str = "6f1c2d3e-4b5a-4c6d-8e7f-001122334455";

/// Starts a mock server and returns a client with install id and api key set
pub async fn setup() -> (MockServer, HttpRemoteClient) {
    let server = MockServer::start().await;
    let client = HttpRemoteClient::new(server.uri(), Duration::from_secs(2))
        .expect("client")
        .with_install_id(INSTALL_ID)
        .with_api_key("test-key");
    (server, client)
}

pub fn start_payload() -> StartPayload {
    StartPayload {
        install_id: INSTALL_ID.to_string(),
        game_id: "game-1".to_string(),
        external_id: "440".to_string(),
        plugin_id: "steam".to_string(),
        game_name: "Portal".to_string(),
        started_at: Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
    }
}

pub fn finish_payload(session_id: &str) -> FinishPayload {
    FinishPayload {
        install_id: INSTALL_ID.to_string(),
        session_id: session_id.to_string(),
        game_id: "game-1".to_string(),
        external_id: "440".to_string(),
        plugin_id: "steam".to_string(),
        session_seconds: 1800,
        total_playtime_seconds: 36_000,
        ended_at: Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap(),
    }
}
