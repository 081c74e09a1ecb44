use std::time::Duration;

/// Runtime knobs for the ingestion pipeline. Built in code rather than read
/// from disk; tests point the base URLs at a local stub server and shrink
/// the timeout.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub snapshot_base_url: String, // "{base}/{HH}.json" is appended per hour
    pub weather_base_url: String,  // Open-Meteo style forecast endpoint
    pub request_timeout: Duration, // Deadline for every outbound request
    pub max_in_flight: Option<usize>, // Cap on simultaneous requests; None = unbounded fan-out
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            snapshot_base_url: "https://a.windbornesystems.com/treasure".to_string(),
            weather_base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            request_timeout: Duration::from_secs(8),
            max_in_flight: None,
        }
    }
}
