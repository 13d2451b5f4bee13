//! HTTP client for fetching detail documents.
//!
//! Enrichment fetches carry no retry budget: a failed fetch skips its task,
//! so the client reports one structured [`FetchError`] per attempt instead of
//! retrying internally.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::config::WorkerConfig;

/// HTTP failure during enrichment, carrying the attempted URL and cause.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },
}

/// Configuration for HTTP client behavior.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-fetch timeout in seconds.
    pub timeout_seconds: u64,
    /// User agent string.
    pub user_agent: String,
}

impl HttpClientConfig {
    pub fn from_worker_config(worker_config: &WorkerConfig) -> Self {
        Self {
            timeout_seconds: worker_config.request_timeout_seconds,
            user_agent: worker_config.user_agent.clone(),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Thin wrapper over `reqwest::Client` with timeout and user-agent applied.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn from_worker_config(worker_config: &WorkerConfig) -> anyhow::Result<Self> {
        Self::with_config(HttpClientConfig::from_worker_config(worker_config))
    }

    pub fn with_config(config: HttpClientConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch the body of `url` as text. Non-2xx, transport errors, timeouts
    /// and empty bodies are all failures.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(timeout_s = self.config.timeout_seconds, "HTTP GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}
