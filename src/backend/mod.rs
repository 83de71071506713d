//! Remote backend client.
//!
//! The bridge consumes five routes: scan up/down, mode set, the speech
//! activity probe, and a health check. Every request is bounded by the
//! client timeout; callers treat a timeout exactly like a connection
//! failure and fall back to local actuation.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Request timeout for all backend calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

/// The appliance-wide operating mode. `Radio` is the default; in `Ai` the
/// speaker belongs to the voice assistant and the tuner is muted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Radio,
    Ai,
}

impl OperatingMode {
    pub fn toggled(self) -> Self {
        match self {
            OperatingMode::Radio => OperatingMode::Ai,
            OperatingMode::Ai => OperatingMode::Radio,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Radio => "radio",
            OperatingMode::Ai => "ai",
        }
    }
}

#[derive(Debug, Serialize)]
struct ModeRequest {
    mode: OperatingMode,
}

#[derive(Debug, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityResponse {
    pub seconds_since_speech: f64,
}

pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn scan_up(&self) -> Result<ScanResponse> {
        self.post_scan("/radio/scan-up").await
    }

    pub async fn scan_down(&self) -> Result<ScanResponse> {
        self.post_scan("/radio/scan-down").await
    }

    async fn post_scan(&self, path: &str) -> Result<ScanResponse> {
        let resp = self
            .http
            .post(self.url(path))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// HTTP 200 is the success signal; the body is ignored.
    pub async fn set_mode(&self, mode: OperatingMode) -> Result<()> {
        self.http
            .post(self.url("/api/mode/set"))
            .json(&ModeRequest { mode })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn activity(&self) -> Result<ActivityResponse> {
        let resp = self
            .http
            .get(self.url("/api/ai/activity"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Any 200 counts as healthy.
    pub async fn health(&self) -> Result<()> {
        self.http
            .get(self.url("/health"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
