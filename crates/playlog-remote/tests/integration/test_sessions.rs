//! Session start/finish endpoints

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use playlog_core::ports::{AckStatus, IRemoteClient};
use playlog_remote::HttpRemoteClient;

use crate::common::{self, INSTALL_ID};

#[tokio::test]
async fn test_start_returns_session_id() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/start"))
        .and(header("X-Install-Id", INSTALL_ID))
        .and(bearer_token("test-key"))
        .and(body_partial_json(json!({
            "installId": INSTALL_ID,
            "gameId": "game-1",
            "externalId": "440",
            "pluginId": "steam",
            "gameName": "Portal"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionId": "sess-42" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client
        .start_session(&common::start_payload())
        .await
        .expect("transport");
    assert_eq!(session.as_deref(), Some("sess-42"));
}

#[tokio::test]
async fn test_start_without_session_id_is_none() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionId": "" })))
        .mount(&server)
        .await;

    let session = client.start_session(&common::start_payload()).await.unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn test_server_error_is_none_not_err() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/start"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client.start_session(&common::start_payload()).await;
    assert!(matches!(result, Ok(None)));
}

#[tokio::test]
async fn test_undecodable_body_is_none() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let ack = client
        .finish_session(&common::finish_payload("sess-42"))
        .await
        .unwrap();
    assert!(ack.is_none());
}

#[tokio::test]
async fn test_finish_returns_ack() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/finish"))
        .and(body_partial_json(json!({
            "sessionId": "sess-42",
            "sessionSeconds": 1800,
            "totalPlaytimeSeconds": 36000
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "status": "queued" })),
        )
        .mount(&server)
        .await;

    let ack = client
        .finish_session(&common::finish_payload("sess-42"))
        .await
        .unwrap()
        .expect("ack");
    assert!(ack.success);
    assert_eq!(ack.status, AckStatus::Queued);
}

#[tokio::test]
async fn test_unreachable_server_is_err() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = HttpRemoteClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let result = client.start_session(&common::start_payload()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_timeout_is_err() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrobble/start"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let client = HttpRemoteClient::new(server.uri(), Duration::from_millis(200)).unwrap();

    let result = client.start_session(&common::start_payload()).await;
    assert!(result.is_err());
}
