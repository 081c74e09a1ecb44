//! Open-Meteo enrichment for balloon tracks.
//!
//! One lookup per balloon at its latest known position. The adapter is
//! total: every failure path degrades to a summary without metrics, with
//! the reason logged. Unit labels are carried through from the source
//! verbatim, no conversion happens here.

use crate::api::FetchError;
use crate::config::PipelineConfig;
use crate::models::{Coords, ExternalSummary, Track, TrackPoint, WeatherMetrics};
use futures::{future, stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Name reported in every summary's `source` field.
pub const SOURCE_NAME: &str = "Open-Meteo";

const NOTE_OK: &str = "Live conditions from Open-Meteo at the balloon's latest position.";
const NOTE_NO_COORDS: &str = "No valid coordinates for this balloon.";
const NOTE_UNAVAILABLE: &str = "External dataset temporarily unavailable.";

pub struct WeatherProvider {
    client: Client,
    config: PipelineConfig,
}

impl Default for WeatherProvider {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl WeatherProvider {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .build()
                .unwrap(),
            config,
        }
    }

    fn forecast_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,wind_speed_10m,wind_direction_10m",
            self.config.weather_base_url, lat, lon
        )
    }

    /// Looks up current conditions at the track's latest point.
    ///
    /// An empty track or non-finite coordinates short-circuit to a
    /// no-coordinates summary without touching the network; request or
    /// parse failures come back as an "unavailable" summary.
    pub async fn fetch_for_track(&self, points: &[TrackPoint]) -> ExternalSummary {
        let Some(latest) = points.last() else {
            return summary_without_coords();
        };
        if !latest.lat.is_finite() || !latest.lon.is_finite() {
            return summary_without_coords();
        }

        match self.try_fetch_current(latest.lat, latest.lon).await {
            Ok(body) => summarize_response(&body, latest.lat, latest.lon),
            Err(err) => {
                warn!(
                    "weather lookup at ({}, {}) failed: {}",
                    latest.lat, latest.lon, err
                );
                summary_unavailable()
            }
        }
    }

    async fn try_fetch_current(&self, lat: f64, lon: f64) -> Result<Value, FetchError> {
        let response = self.client.get(self.forecast_url(lat, lon)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Enriches every track concurrently, mapping balloon id to summary.
    /// Individual failures are already absorbed per lookup, so the result
    /// always has one entry per track.
    pub async fn enrich_all(
        &self,
        tracks: &BTreeMap<String, Track>,
    ) -> HashMap<String, ExternalSummary> {
        // Each lookup owns its id and points; the enclosing cycle future
        // crosses a task boundary and must not borrow from the map.
        let jobs: Vec<(String, Vec<TrackPoint>)> = tracks
            .values()
            .map(|track| (track.id.clone(), track.points.clone()))
            .collect();
        let lookups = jobs.into_iter().map(|(id, points)| async move {
            let summary = self.fetch_for_track(&points).await;
            (id, summary)
        });
        let entries: Vec<(String, ExternalSummary)> = match self.config.max_in_flight {
            Some(cap) => stream::iter(lookups).buffer_unordered(cap.max(1)).collect().await,
            None => future::join_all(lookups).await,
        };
        entries.into_iter().collect()
    }
}

/// Maps a forecast response into the canonical summary. Prefers the modern
/// `current` block and falls back to the legacy `current_weather` block
/// with its fixed km/h wind units. Junk values inside a recognized block
/// simply leave the matching metric unset.
pub fn summarize_response(body: &Value, lat: f64, lon: f64) -> ExternalSummary {
    let mut metrics = WeatherMetrics::default();
    let mut units = BTreeMap::new();

    let modern = body
        .get("current")
        .filter(|block| block.get("temperature_2m").is_some_and(|v| !v.is_null()));
    let legacy = body
        .get("current_weather")
        .filter(|block| block.get("temperature").is_some_and(|v| !v.is_null()));

    if let Some(current) = modern {
        metrics.temperature_c = finite(current.get("temperature_2m"));
        metrics.wind_speed = finite(current.get("wind_speed_10m"));
        metrics.wind_direction_deg = finite(current.get("wind_direction_10m"));
        units = match body.get("current_units").and_then(Value::as_object) {
            Some(labels) => string_entries(labels),
            None => default_units(""),
        };
    } else if let Some(current) = legacy {
        metrics.temperature_c = finite(current.get("temperature"));
        metrics.wind_speed = finite(current.get("windspeed"));
        metrics.wind_direction_deg = finite(current.get("winddirection"));
        units = default_units("km/h");
    }

    ExternalSummary {
        source: SOURCE_NAME.to_string(),
        note: NOTE_OK.to_string(),
        coords: Some(Coords { lat, lon }),
        units: Some(units),
        metrics: Some(metrics),
    }
}

fn summary_without_coords() -> ExternalSummary {
    ExternalSummary {
        source: SOURCE_NAME.to_string(),
        note: NOTE_NO_COORDS.to_string(),
        coords: None,
        units: None,
        metrics: None,
    }
}

fn summary_unavailable() -> ExternalSummary {
    ExternalSummary {
        source: SOURCE_NAME.to_string(),
        note: NOTE_UNAVAILABLE.to_string(),
        coords: None,
        units: None,
        metrics: None,
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn string_entries(labels: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_string())))
        .collect()
}

fn default_units(wind_speed_label: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("temperature_2m".to_string(), "°C".to_string()),
        ("wind_speed_10m".to_string(), wind_speed_label.to_string()),
        ("wind_direction_10m".to_string(), "°".to_string()),
    ])
}
