//! Canonical balloon data model, plus the normalizer that turns the
//! snapshot endpoint's undocumented record shapes into [`TrackPoint`]s.
//!
//! The snapshot source publishes one JSON document per hour with no schema
//! guarantee. Individual records show up as positional arrays, as objects
//! with varying key spellings, or as garbage. Everything in this module is
//! total: input we cannot read becomes `None`, never a panic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// Keys the keyed encoding has been observed using, in resolution order.
// The first key that is present and non-null wins, even if its value then
// fails the numeric check.
const LAT_KEYS: [&str; 4] = ["lat", "latitude", "Latitude", "y"];
const LON_KEYS: [&str; 5] = ["lon", "lng", "longitude", "Longitude", "x"];
const TS_KEYS: [&str; 4] = ["ts", "timestamp", "time", "observed_at"];
const ID_KEYS: [&str; 5] = ["id", "track_id", "balloon_id", "name", "uuid"];

/// A timestamp exactly as the source provided it. The endpoint mixes
/// numeric epochs and string datetimes; both are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(f64),
    Text(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Epoch(n) => write!(f, "{}", n),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized observation. Latitude and longitude are always finite;
/// `hour` is the snapshot index it came from (0 = most recent hour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ts: Option<Timestamp>,
    pub hour: u8,
}

/// Normalizer output: one point plus the balloon id it resolved or
/// synthesized for grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub id: String,
    pub point: TrackPoint,
}

/// The position history attributed to one balloon id. After assembly the
/// points run oldest (hour 23) to newest (hour 0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub points: Vec<TrackPoint>,
}

/// Latest-position summary for the constellation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationEntry {
    pub id: String,
    pub latest_lat: f64,
    pub latest_lon: f64,
    pub history: Vec<TrackPoint>,
}

/// A coordinate pair echoed back by the weather adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// Current-conditions readings. A field is `Some` only when the upstream
/// value was a finite number; the matching unit labels live on
/// [`ExternalSummary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherMetrics {
    pub temperature_c: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction_deg: Option<f64>,
}

/// Per-balloon weather enrichment. `metrics`, `units` and `coords` are all
/// `None` when the lookup failed or the balloon had no usable coordinates;
/// absence here is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalSummary {
    pub source: String,
    pub note: String,
    pub coords: Option<Coords>,
    pub units: Option<BTreeMap<String, String>>,
    pub metrics: Option<WeatherMetrics>,
}

/// The record encodings the snapshot source is known to emit, tried in
/// order. Everything else lands on `Unrecognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordShape {
    /// Positional row: `[lat, lon, alt?, ts?]`. The altitude slot is
    /// ignored; slot 3 is kept as a timestamp when it is a number or string.
    Ordered {
        lat: f64,
        lon: f64,
        ts: Option<Timestamp>,
    },
    /// An object spelling lat/lon one of several ways, with optional
    /// timestamp and id fields.
    Keyed {
        lat: f64,
        lon: f64,
        ts: Option<Timestamp>,
        id: Option<String>,
    },
    Unrecognized,
}

impl RecordShape {
    /// Tries each known encoding against `raw`, first match wins.
    pub fn classify(raw: &Value) -> RecordShape {
        Self::as_ordered(raw)
            .or_else(|| Self::as_keyed(raw))
            .unwrap_or(RecordShape::Unrecognized)
    }

    fn as_ordered(raw: &Value) -> Option<RecordShape> {
        let items = raw.as_array()?;
        let lat = items.first()?.as_f64().filter(|v| v.is_finite())?;
        let lon = items.get(1)?.as_f64().filter(|v| v.is_finite())?;
        let ts = items.get(3).and_then(timestamp_from);
        Some(RecordShape::Ordered { lat, lon, ts })
    }

    fn as_keyed(raw: &Value) -> Option<RecordShape> {
        let map = raw.as_object()?;
        let lat = first_present(map, &LAT_KEYS)?
            .as_f64()
            .filter(|v| v.is_finite())?;
        let lon = first_present(map, &LON_KEYS)?
            .as_f64()
            .filter(|v| v.is_finite())?;
        let ts = first_present(map, &TS_KEYS).and_then(timestamp_from);
        let id = first_present(map, &ID_KEYS).and_then(id_from);
        Some(RecordShape::Keyed { lat, lon, ts, id })
    }
}

/// Normalizes one raw record taken from hour `hour`.
///
/// Returns `None` for any record without recognizable numeric coordinates;
/// callers drop those silently. When no id field resolves, one is
/// synthesized from the hour, the coordinates at four decimal places and
/// the timestamp, so identical anonymous records within an hour collapse
/// into one balloon. Synthesized ids embed the hour, which means anonymous
/// balloons never link up across hours.
pub fn normalize_record(raw: &Value, hour: u8) -> Option<NormalizedRecord> {
    let (lat, lon, ts, id) = match RecordShape::classify(raw) {
        RecordShape::Ordered { lat, lon, ts } => (lat, lon, ts, None),
        RecordShape::Keyed { lat, lon, ts, id } => (lat, lon, ts, id),
        RecordShape::Unrecognized => return None,
    };

    let id = id.unwrap_or_else(|| synthesize_id(hour, lat, lon, ts.as_ref()));
    Some(NormalizedRecord {
        id,
        point: TrackPoint { lat, lon, ts, hour },
    })
}

fn first_present<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key).filter(|v| !v.is_null()))
}

fn timestamp_from(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => n.as_f64().map(Timestamp::Epoch),
        Value::String(s) => Some(Timestamp::Text(s.clone())),
        _ => None,
    }
}

fn id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn synthesize_id(hour: u8, lat: f64, lon: f64, ts: Option<&Timestamp>) -> String {
    let ts = ts.map(Timestamp::to_string).unwrap_or_else(|| "na".to_string());
    format!("u_{hour}_{lat:.4}_{lon:.4}_{ts}")
}
