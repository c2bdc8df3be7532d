//! HTTP client for the log-search backend
//!
//! One POST endpoint, token-header auth. Non-success statuses surface as
//! [`LogSearchError::Upstream`]; zero hits is a normal empty result.

use crate::error::{LogSearchError, LogSearchResult};
use crate::hit::{RawHit, SearchResponse};
use crate::query::SearchQuery;
use reqwest::Client;
use std::time::Duration;
use stitch_core::config::LogSearchSettings;
use tracing::{debug, error};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the log-search backend.
pub struct LogSearchClient {
    client: Client,
    settings: LogSearchSettings,
}

impl LogSearchClient {
    /// Create a new client from injected settings.
    pub fn new(settings: LogSearchSettings) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("tracestitch/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, settings }
    }

    /// Backend-specific settings (edge sentinel, dispatch action name).
    pub fn settings(&self) -> &LogSearchSettings {
        &self.settings
    }

    /// Run one query and return the raw hits, newest first.
    pub async fn run_query(&self, query: &SearchQuery) -> LogSearchResult<Vec<RawHit>> {
        debug!("Log-search query: {}", query.expression);

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("token", &self.settings.token)
            .json(&query.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Log-search request failed with status {}", status);
            return Err(LogSearchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.hits.map(|envelope| envelope.hits).unwrap_or_default())
    }
}
