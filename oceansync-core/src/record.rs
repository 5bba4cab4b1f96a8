//! Record data structures for the three observation series

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Wave-field time label format, e.g. `05-Aug-2011__08-00-00`
pub const TIME_LABEL_FORMAT: &str = "%d-%b-%Y__%H-%M-%S";

/// Identifier of a point record; feeds use both numeric and textual ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Int(id.into())
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

/// A timestamped position fix from a point-observation series
/// (glider telemetry or typhoon track).
///
/// Only `id`, `timestamp`, `longitude` and `latitude` are interpreted; every
/// other field of the source record travels in `extras` untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    /// Identifier from the source feed
    pub id: RecordId,
    /// Observation time, `None` when the source value could not be parsed
    pub timestamp: Option<DateTime<Utc>>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Domain-specific fields carried as an opaque payload
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl PointRecord {
    /// Creates a well-formed record with no extra fields
    pub fn new(id: impl Into<RecordId>, timestamp: DateTime<Utc>, longitude: f64, latitude: f64) -> Self {
        Self {
            id: id.into(),
            timestamp: Some(timestamp),
            longitude: Some(longitude),
            latitude: Some(latitude),
            extras: Map::new(),
        }
    }

    /// Attaches an extra domain field
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Returns `(longitude, latitude)` when both are present and finite
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }

    /// The timestamp used for matching, or `None` if the record is malformed.
    ///
    /// A record without a valid position is never matched either.
    pub fn matchable_time(&self) -> Option<DateTime<Utc>> {
        self.position().and(self.timestamp)
    }
}

/// One full wave-field snapshot at a single instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSnapshot {
    /// Source label of the snapshot layer
    pub time_label: String,
    /// Ordinal assigned at load time; rendering state is keyed by it
    pub index: usize,
    /// Snapshot time
    pub timestamp: DateTime<Utc>,
}

impl GridSnapshot {
    /// Creates a new snapshot record
    pub fn new(index: usize, time_label: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            time_label: time_label.into(),
            index,
            timestamp,
        }
    }

    /// Creates a snapshot whose timestamp is parsed from its label
    pub fn from_label(index: usize, time_label: &str) -> Result<Self> {
        let timestamp = parse_time_label(time_label)?;
        Ok(Self::new(index, time_label, timestamp))
    }
}

/// Parses a wave-field label such as `05-Aug-2011__08-00-00` as UTC
pub fn parse_time_label(label: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(label.trim(), TIME_LABEL_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidTimeLabel(label.to_string()))
}

/// Formats a timestamp in the wave-field label format
pub fn format_time_label(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIME_LABEL_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_time_label() {
        let ts = parse_time_label("05-Aug-2011__08-00-00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2011, 8, 5, 8, 0, 0).unwrap());
        assert_eq!(format_time_label(&ts), "05-Aug-2011__08-00-00");
    }

    #[test]
    fn test_parse_time_label_rejects_garbage() {
        let err = parse_time_label("idw_masked").unwrap_err();
        assert!(matches!(err, Error::InvalidTimeLabel(_)));
    }

    #[test]
    fn test_snapshot_from_label() {
        let snapshot = GridSnapshot::from_label(3, "06-Aug-2011__14-30-00").unwrap();
        assert_eq!(snapshot.index, 3);
        assert_eq!(
            snapshot.timestamp,
            Utc.with_ymd_and_hms(2011, 8, 6, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_matchable_time_requires_position() {
        let ts = Utc.with_ymd_and_hms(2011, 8, 5, 8, 0, 0).unwrap();
        let mut record = PointRecord::new(1, ts, 122.5, 29.1);
        assert_eq!(record.matchable_time(), Some(ts));

        record.latitude = None;
        assert_eq!(record.matchable_time(), None);

        record.latitude = Some(f64::NAN);
        assert_eq!(record.matchable_time(), None);

        let mut record = PointRecord::new("g-1", ts, 122.5, 29.1);
        record.timestamp = None;
        assert_eq!(record.matchable_time(), None);
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::from(42).to_string(), "42");
        assert_eq!(RecordId::from("MUIFA-07").to_string(), "MUIFA-07");
    }

    #[test]
    fn test_extras_are_flattened_on_serialize() {
        let ts = Utc.with_ymd_and_hms(2011, 8, 5, 8, 0, 0).unwrap();
        let record = PointRecord::new(7, ts, 122.5, 29.1).with_extra("radius", 350);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["radius"], 350);
    }
}
