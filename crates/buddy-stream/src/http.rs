//! Production HTTP transport backed by reqwest.
//!
//! Endpoint configuration lives here so the rest of the crate stays
//! transport-agnostic behind [`StreamTransport`].

use std::time::Duration;

use futures::StreamExt as _;
use tracing::debug;

use crate::errors::{BuddyError, TransportError};
use crate::model::Feature;
use crate::transport::{ByteStreamHandle, StreamTransport, TurnRequest};

/// Configuration for the platform API client.
#[derive(Clone, Debug)]
pub struct BuddyApiConfig {
    /// Base URL of the platform API.
    pub base_url: String,
    /// Optional bearer token attached to every request.
    pub auth_token: Option<String>,
    /// Default HTTP timeout for establishing the response.
    ///
    /// This bounds connection and header time, not the streamed body; use
    /// `TurnBuilder::idle_timeout` to bound a stalled body.
    pub timeout: Duration,
}

impl BuddyApiConfig {
    /// Creates a config with sensible defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds a config from `BUDDY_API_URL` and optional `BUDDY_API_TOKEN`.
    pub fn from_env() -> Result<Self, BuddyError> {
        let base_url = std::env::var("BUDDY_API_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(BuddyError::Config(
                "missing BUDDY_API_URL for the HTTP transport".into(),
            ));
        }
        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var("BUDDY_API_TOKEN") {
            if !token.trim().is_empty() {
                config.auth_token = Some(token);
            }
        }
        Ok(config)
    }

    /// Sets the bearer token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn stream_url(&self, feature: Feature) -> String {
        let base = self.base_url.trim_end_matches('/');
        match feature {
            Feature::Chat => format!("{base}/v1/buddy/chat"),
            Feature::Story => format!("{base}/v1/stories/generate"),
        }
    }
}

/// reqwest-backed transport for the platform streaming endpoints.
pub struct BuddyApiClient {
    client: reqwest::Client,
    config: BuddyApiConfig,
}

impl BuddyApiClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: BuddyApiConfig) -> Result<Self, BuddyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| BuddyError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client using `BUDDY_API_URL` / `BUDDY_API_TOKEN`.
    pub fn from_env() -> Result<Self, BuddyError> {
        Self::new(BuddyApiConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl StreamTransport for BuddyApiClient {
    async fn open(&self, request: TurnRequest) -> Result<ByteStreamHandle, TransportError> {
        debug!(
            turn_id = %request.turn_id,
            conversation_id = %request.conversation_id,
            feature = %request.feature,
            "opening buddy stream"
        );

        let mut http_req = self
            .client
            .post(self.config.stream_url(request.feature))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request.body());
        if let Some(token) = self.config.auth_token.as_deref() {
            http_req = http_req.bearer_auth(token);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| TransportError::connect(format!("buddy request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(status.as_u16(), body));
        }

        let bytes = response
            .bytes_stream()
            .map(|r| r.map_err(|e| TransportError::read(format!("buddy stream read failed: {e}"))));
        Ok(ByteStreamHandle {
            bytes: Box::pin(bytes),
        })
    }
}
