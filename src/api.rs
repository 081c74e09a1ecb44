use crate::config::PipelineConfig;
use crate::history::{self, ConstellationHistory, SNAPSHOT_HOURS};
use futures::{future, stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single snapshot fetch produced nothing. Callers only ever see the
/// resulting absence; the reason is logged and kept around for tests.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

pub struct SnapshotProvider {
    client: Client,
    config: PipelineConfig,
}

impl Default for SnapshotProvider {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl SnapshotProvider {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .build()
                .unwrap(),
            config,
        }
    }

    fn hour_url(&self, hour: u8) -> String {
        format!("{}/{:02}.json", self.config.snapshot_base_url, hour)
    }

    /// Fetches one hourly snapshot. Every failure mode (connect error,
    /// timeout, bad status, malformed body) collapses to `None` so a dead
    /// hour cannot take down the other 23.
    pub async fn fetch_snapshot(&self, hour: u8) -> Option<Value> {
        match self.try_fetch_snapshot(hour).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("snapshot {:02} dropped: {}", hour, err);
                None
            }
        }
    }

    async fn try_fetch_snapshot(&self, hour: u8) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(self.hour_url(hour))
            .header("accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Runs one load cycle: fetch all 24 hourly snapshots concurrently,
    /// each fault-isolated, then normalize, group and derive the
    /// constellation from whatever survived.
    pub async fn fetch_history(&self) -> ConstellationHistory {
        let fetches = (0..SNAPSHOT_HOURS).map(|hour| self.fetch_snapshot(hour));
        let snapshots: Vec<Option<Value>> = match self.config.max_in_flight {
            Some(cap) => stream::iter(fetches).buffered(cap.max(1)).collect().await,
            None => future::join_all(fetches).await,
        };

        let history = history::assemble(snapshots);
        debug!(
            "cycle assembled: {} balloons from {} populated hours",
            history.constellation.len(),
            history.raw_hours.iter().filter(|h| !h.is_empty()).count()
        );
        history
    }
}
