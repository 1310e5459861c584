//! HTTP draw source.
//!
//! Talks to a draw API exposing:
//!
//! | Endpoint | Response |
//! |----------|----------|
//! | `GET {base}/api/fc3d?limit=N` | `{"success": true, "data": [...]}` |
//! | `GET {base}/api/ssq?limit=N` | same shape |
//! | `GET {base}/api/health` | 2xx with a JSON body |
//!
//! A response counts as data only when it is 2xx, parses as the envelope
//! above, has `success == true` and carries a non-empty `data` array.
//! Requests are never retried; the caller decides what a failure means.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use async_trait::async_trait;
use draw_harness_core::models::Game;

use crate::traits::{DrawSource, FetchError, FetchOutcome};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Response envelope of `/api/{game}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpDrawSource {
    client: reqwest::Client,
}

impl HttpDrawSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("draw-harness/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DrawSource for HttpDrawSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn health(&self, base_url: &str) -> Result<(), FetchError> {
        let url = format!("{}/api/health", base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_health(&body)
    }

    async fn fetch(&self, base_url: &str, game: Game, limit: usize) -> FetchOutcome<Vec<Value>> {
        let url = format!("{}/api/{}", base_url, game.slug());
        tracing::debug!(%game, %url, limit, "requesting draws");

        let resp = match self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return FetchOutcome::Failed(FetchError::Network(e.to_string())),
        };

        let status = resp.status();
        if !status.is_success() {
            return FetchOutcome::Failed(FetchError::Status(status.as_u16()));
        }

        match resp.text().await {
            Ok(body) => parse_envelope(&body),
            Err(e) => FetchOutcome::Failed(FetchError::Network(e.to_string())),
        }
    }
}

/// A 2xx health response still has to be JSON.
pub fn parse_health(body: &str) -> Result<(), FetchError> {
    serde_json::from_str::<Value>(body)
        .map(|_| ())
        .map_err(|e| FetchError::Parse(e.to_string()))
}

/// Interpret a 2xx response body.
pub fn parse_envelope(body: &str) -> FetchOutcome<Vec<Value>> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(e) => return FetchOutcome::Failed(FetchError::Parse(e.to_string())),
    };
    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "success flag not set".to_string());
        return FetchOutcome::Failed(FetchError::Unsuccessful(message));
    }
    match envelope.data {
        Some(data) if !data.is_empty() => FetchOutcome::Data(data),
        _ => FetchOutcome::Empty,
    }
}
