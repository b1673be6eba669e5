//! HTTP client for the tracking server.

use anyhow::Result;
use reqwest::{StatusCode, Url};
use sager_core::{encode_batch, FeedStatus, RawReport, StatsReport, TrackedEntity};
use serde::Deserialize;

use crate::stream::{StreamFilter, TrackStream};

/// Client for one tracking server.
#[derive(Debug, Clone)]
pub struct SagerClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct IngestResponse {
    pub accepted: bool,
    pub reports: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub feed: FeedStatus,
    pub feed_configured: bool,
    pub batches_processed: u64,
    pub tracked: usize,
}

impl SagerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Push one batch of reports in the feed's wire format.
    pub async fn send_batch(&self, reports: &[RawReport]) -> Result<IngestResponse> {
        let url = format!("{}/v1/reports", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&encode_batch(reports))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to send batch: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn list_drones(&self) -> Result<Vec<TrackedEntity>> {
        let url = format!("{}/v1/drones", self.base_url);
        Ok(self.client.get(&url).send().await?.error_for_status()?.json().await?)
    }

    /// Returns `None` when the drone is not tracked.
    pub async fn get_drone(&self, drone_id: &str) -> Result<Option<TrackedEntity>> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid base URL"))?
            .pop_if_empty()
            .extend(["v1", "drones", drone_id]);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    pub async fn stats(&self) -> Result<StatsReport> {
        let url = format!("{}/v1/stats", self.base_url);
        Ok(self.client.get(&url).send().await?.error_for_status()?.json().await?)
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let url = format!("{}/v1/status", self.base_url);
        Ok(self.client.get(&url).send().await?.error_for_status()?.json().await?)
    }

    /// Open the change stream.
    pub async fn subscribe(&self, filter: StreamFilter) -> Result<TrackStream> {
        TrackStream::connect(&self.base_url, &filter).await
    }
}
