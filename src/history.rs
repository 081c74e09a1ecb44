//! Snapshot flattening and track assembly.
//!
//! Pure functions between "24 raw JSON documents" and the constellation the
//! view renders. Fetching those documents is [`crate::api`]'s job; nothing
//! here touches the network.

use crate::models::{normalize_record, ConstellationEntry, NormalizedRecord, Track};
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of hourly snapshots in one load cycle. Hour 0 is the most recent.
pub const SNAPSHOT_HOURS: u8 = 24;

/// One load cycle's assembled output.
#[derive(Debug, Clone, Default)]
pub struct ConstellationHistory {
    /// One entry per balloon, ordered by id.
    pub constellation: Vec<ConstellationEntry>,
    /// Full per-balloon tracks, keyed by id.
    pub tracks: BTreeMap<String, Track>,
    /// Normalized records per hour, index 0 = most recent. Hours that were
    /// absent or unreadable are empty.
    pub raw_hours: Vec<Vec<NormalizedRecord>>,
}

/// Extracts normalization candidates from one hour's snapshot and runs
/// each through [`normalize_record`].
///
/// Sequence snapshots are normalized element-wise. Mapping snapshots are
/// flattened one level: a value that is itself a sequence contributes its
/// elements, a value that is a mapping counts as a single record, scalar
/// values contribute nothing. Any other document, including an absent
/// hour, yields no records.
pub fn collect_hour_records(snapshot: Option<&Value>, hour: u8) -> Vec<NormalizedRecord> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };

    match snapshot {
        Value::Array(items) => items
            .iter()
            .filter_map(|raw| normalize_record(raw, hour))
            .collect(),
        Value::Object(map) => {
            let mut candidates: Vec<&Value> = Vec::new();
            for value in map.values() {
                match value {
                    Value::Array(nested) => candidates.extend(nested.iter()),
                    Value::Object(_) => candidates.push(value),
                    _ => {}
                }
            }
            candidates
                .into_iter()
                .filter_map(|raw| normalize_record(raw, hour))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Groups records by balloon id and orders each track oldest to newest.
///
/// Points are appended in encounter order (hour 0 first), then each track
/// is stable-sorted by hour descending, so hour 23 leads and hour 0 is
/// last. Same-hour records keep their snapshot order. Both the drift sum
/// and the "latest position" rule depend on this ordering.
pub fn group_into_tracks(hours: &[Vec<NormalizedRecord>]) -> BTreeMap<String, Track> {
    let mut tracks: BTreeMap<String, Track> = BTreeMap::new();
    for records in hours {
        for record in records {
            tracks
                .entry(record.id.clone())
                .or_insert_with(|| Track { id: record.id.clone(), points: Vec::new() })
                .points
                .push(record.point.clone());
        }
    }
    for track in tracks.values_mut() {
        track.points.sort_by(|a, b| b.hour.cmp(&a.hour));
    }
    tracks
}

/// Builds the constellation list: one entry per track, latest position
/// taken from the last point after sorting. That is hour 0 when the track
/// has one, otherwise the smallest hour it actually covers.
pub fn derive_constellation(tracks: &BTreeMap<String, Track>) -> Vec<ConstellationEntry> {
    tracks
        .values()
        .filter_map(|track| {
            track.points.last().map(|latest| ConstellationEntry {
                id: track.id.clone(),
                latest_lat: latest.lat,
                latest_lon: latest.lon,
                history: track.points.clone(),
            })
        })
        .collect()
}

/// Assembles a full load cycle from fetched snapshots, index = hour,
/// absent hours as `None`.
pub fn assemble(snapshots: Vec<Option<Value>>) -> ConstellationHistory {
    let raw_hours: Vec<Vec<NormalizedRecord>> = snapshots
        .iter()
        .enumerate()
        .map(|(hour, snapshot)| collect_hour_records(snapshot.as_ref(), hour as u8))
        .collect();
    let tracks = group_into_tracks(&raw_hours);
    let constellation = derive_constellation(&tracks);
    ConstellationHistory { constellation, tracks, raw_hours }
}
