//! HTTP client for the rolling stock solver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::request::Request;
use crate::response::Response;

use super::error::SolverError;

/// Default base URL of a locally running solver.
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Solving large instances takes minutes.
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Configuration for the solver client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    /// Base URL, without the `/solve` path
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the solver's base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Sends scheduling requests to the solver's `/solve` endpoint.
#[derive(Debug, Clone)]
pub struct SolverClient {
    http: reqwest::Client,
    url: String,
}

impl SolverClient {
    pub fn new(config: SolverConfig) -> Result<Self, SolverError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/solve", config.base_url.trim_end_matches('/')),
        })
    }

    /// The endpoint requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post a request and wait for the schedule.
    pub async fn solve(&self, request: &Request) -> Result<Response, SolverError> {
        info!(url = %self.url, "Sending request to solver");
        let response = self.http.post(&self.url).json(request).send().await?;

        let status = response.status();
        info!(status = status.as_u16(), "Received solver response");
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SolverError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let parsed = Response::from_json(&body).map_err(|e| SolverError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })?;
        info!(
            running_time = %parsed.info.running_time,
            vehicles = parsed.objective_value.vehicle_count,
            "Parsed solver response"
        );
        Ok(parsed)
    }
}
