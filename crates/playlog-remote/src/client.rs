//! Telemetry service client
//!
//! Every call returns `Err` for transport failures (connection refused,
//! timeout) and `Ok(None)` when the server answered with a non-success
//! status or a body that could not be decoded. Both count as a failed
//! attempt upstream; the distinction only shows in the logs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use playlog_remote::HttpRemoteClient;
//!
//! # fn example() -> Result<(), playlog_remote::RemoteError> {
//! let client = HttpRemoteClient::new("https://api.playlog.app/v1", Duration::from_secs(30))?
//!     .with_install_id("2b8f0c4e-0000-4000-8000-000000000000")
//!     .with_api_key("secret");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use playlog_core::config::RemoteConfig;
use playlog_core::domain::{FinishPayload, StartPayload};
use playlog_core::ports::{
    AchievementsDiffRequest, AchievementsFullRequest, IRemoteClient, LibraryDiffRequest,
    LibraryFullRequest, SyncAck,
};

use crate::RemoteError;

/// Header carrying the install id on every request
pub const INSTALL_ID_HEADER: &str = "X-Install-Id";

// ============================================================================
// Response types
// ============================================================================

/// Response of `POST /scrobble/start`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    session_id: Option<String>,
}

/// Response of `GET /sync/sources`
#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<String>,
}

// ============================================================================
// HttpRemoteClient
// ============================================================================

/// `reqwest` implementation of [`IRemoteClient`]
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    install_id: Option<String>,
    api_key: Option<String>,
}

impl HttpRemoteClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            install_id: None,
            api_key: None,
        })
    }

    /// Creates a client from the `remote` config section
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Self::new(config.base_url.clone(), config.request_timeout())?;
        Ok(match &config.api_key {
            Some(key) if !key.is_empty() => client.with_api_key(key.clone()),
            _ => client,
        })
    }

    pub fn with_install_id(mut self, install_id: impl Into<String>) -> Self {
        self.install_id = Some(install_id.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request builder with the base URL, install id and credentials applied
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, &url);
        if let Some(install_id) = &self.install_id {
            builder = builder.header(INSTALL_ID_HEADER, install_id);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        builder
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<Option<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(path, "POST");
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        decode(path, response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<Option<R>> {
        debug!(path, "GET");
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        decode(path, response).await
    }
}

/// Maps a response to `Ok(None)` unless it is a 2xx with a decodable body
async fn decode<R: DeserializeOwned>(path: &str, response: Response) -> Result<Option<R>> {
    let status = response.status();
    if !status.is_success() {
        warn!(path, status = status.as_u16(), "Server returned error status");
        return Ok(None);
    }

    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read {path} response body"))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        warn!(path, "Server returned empty body");
        return Ok(None);
    }

    match serde_json::from_slice(&body) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path, error = %e, "Failed to decode response");
            Ok(None)
        }
    }
}

#[async_trait::async_trait]
impl IRemoteClient for HttpRemoteClient {
    async fn start_session(&self, payload: &StartPayload) -> Result<Option<String>> {
        let response: Option<StartResponse> = self.post("/scrobble/start", payload).await?;
        Ok(response
            .and_then(|r| r.session_id)
            .filter(|id| !id.is_empty()))
    }

    async fn finish_session(&self, payload: &FinishPayload) -> Result<Option<SyncAck>> {
        self.post("/scrobble/finish", payload).await
    }

    async fn sync_library_full(&self, request: &LibraryFullRequest) -> Result<Option<SyncAck>> {
        self.post("/sync/library", request).await
    }

    async fn sync_library_diff(&self, request: &LibraryDiffRequest) -> Result<Option<SyncAck>> {
        self.post("/sync/library/diff", request).await
    }

    async fn sync_achievements_full(
        &self,
        request: &AchievementsFullRequest,
    ) -> Result<Option<SyncAck>> {
        self.post("/sync/achievements", request).await
    }

    async fn sync_achievements_diff(
        &self,
        request: &AchievementsDiffRequest,
    ) -> Result<Option<SyncAck>> {
        self.post("/sync/achievements/diff", request).await
    }

    async fn get_allowed_sources(&self) -> Result<Option<Vec<String>>> {
        let response: Option<SourcesResponse> = self.get("/sync/sources").await?;
        Ok(response.map(|r| r.sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = HttpRemoteClient::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = HttpRemoteClient::new("http://localhost:8080/v1/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_from_config_ignores_empty_api_key() {
        let config = RemoteConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        let client = HttpRemoteClient::from_config(&config).unwrap();
        assert!(client.api_key.is_none());
    }
}
