//! JSON-over-HTTP helper with a fixed timeout and no retries.
//!
//! Abilities have seconds, not minutes, to answer; a slow service must
//! turn into a spoken fallback quickly.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

// ═══════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies us to services that require it (Nominatim does).
pub const DEFAULT_USER_AGENT: &str = concat!("voice-abilities/", env!("CARGO_PKG_VERSION"));

// ═══════════════════════════════════════════════════════════════════════
//  Fetcher
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::InvalidParams {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, timeout })
    }

    /// Fetcher with the default user agent and timeout.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `query` parameters and decode the body as JSON.
    pub async fn get_json(&self, service: &str, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = url::Url::parse_with_params(url, query).map_err(|e| {
            AdapterError::InvalidParams {
                reason: format!("invalid URL `{url}`: {e}"),
            }
        })?;

        debug!(service, url = %url, "GET");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(service, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(service, status = status.as_u16(), "non-success status");
            return Err(AdapterError::HttpStatus {
                service: service.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.transport_error(service, e))?;

        serde_json::from_str(&body).map_err(|e| AdapterError::InvalidResponse {
            service: service.to_string(),
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, service: &str, err: reqwest::Error) -> AdapterError {
        if err.is_timeout() {
            warn!(service, seconds = self.timeout.as_secs(), "request timed out");
            AdapterError::Timeout {
                service: service.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            AdapterError::RequestFailed {
                service: service.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
