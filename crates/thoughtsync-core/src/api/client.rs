//! HTTP client for the published snapshot.
//!
//! The snapshot is a static JSON file (GitHub Pages by default), so the client
//! only ever issues plain GETs. Parsing is left to the caller so that a
//! malformed body is reported the same way regardless of the source.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::SyncError;

/// Query parameter carrying the cache-busting token.
const CACHE_BUST_PARAM: &str = "t";

/// Where the snapshot is read from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Location of the snapshot, without the cache-busting token.
    fn base_url(&self) -> &str;

    /// Fetch the raw snapshot body from `url`.
    async fn fetch(&self, url: &str) -> Result<String, SyncError>;
}

/// Append the cache-busting token to `base`, keeping any existing query.
pub fn cache_busting_url(base: &str, token: i64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, CACHE_BUST_PARAM, token)
}

/// Snapshot source backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SnapshotClient {
    client: Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, url: &str) -> Result<String, SyncError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body = response.text().await?;
        debug!(url = url, bytes = body.len(), "Snapshot response received");
        Ok(body)
    }
}
