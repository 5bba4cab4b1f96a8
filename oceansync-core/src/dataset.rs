//! JSON Lines loading for the three observation feeds
//!
//! Each feed is one JSON object per line. A line that cannot be read as a
//! record is skipped and counted; a record whose time cannot be parsed is
//! kept with an empty timestamp so it stays visible to callers but never
//! takes part in frame matching.

use crate::record::{parse_time_label, TIME_LABEL_FORMAT};
use crate::{GridSnapshot, PointRecord, RecordId, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Formats tried, in order, for textual timestamps without an offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    TIME_LABEL_FORMAT,
];

/// Records loaded from one feed
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    /// Accepted records in file order
    pub records: Vec<T>,
    /// Number of non-blank lines that were rejected
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawPointRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    unix_timestamp: Option<f64>,
    #[serde(default)]
    longitude: Option<Value>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(flatten)]
    extras: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    time_label: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    unix_timestamp: Option<f64>,
}

/// Loads point records (glider or typhoon feed) from JSON Lines
pub fn load_point_records<R: BufRead>(reader: R) -> Result<Dataset<PointRecord>> {
    read_lines(reader, "point", |line| {
        let raw: RawPointRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
        let id = raw.id.ok_or("missing id")?;

        let timestamp = raw
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| raw.unix_timestamp.and_then(from_unix_seconds))
            .or_else(|| split_date_time(&raw.extras));

        Ok(PointRecord {
            id,
            timestamp,
            longitude: raw.longitude.as_ref().and_then(Value::as_f64),
            latitude: raw.latitude.as_ref().and_then(Value::as_f64),
            extras: raw.extras,
        })
    })
}

/// Loads wave-field snapshots from JSON Lines.
///
/// Indices are assigned from the position among accepted lines.
pub fn load_snapshots<R: BufRead>(reader: R) -> Result<Dataset<GridSnapshot>> {
    let mut dataset = read_lines(reader, "snapshot", |line| {
        let raw: RawSnapshot = serde_json::from_str(line).map_err(|e| e.to_string())?;

        let timestamp = raw
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| raw.unix_timestamp.and_then(from_unix_seconds))
            .or_else(|| raw.time_label.as_deref().and_then(|l| parse_time_label(l).ok()))
            .ok_or("unresolvable snapshot time")?;

        let label = raw
            .time_label
            .unwrap_or_else(|| timestamp.format(TIME_LABEL_FORMAT).to_string());

        Ok(GridSnapshot::new(0, label, timestamp))
    })?;

    for (index, snapshot) in dataset.records.iter_mut().enumerate() {
        snapshot.index = index;
    }
    Ok(dataset)
}

/// Opens a file and loads point records from it
pub fn load_point_records_from_path(path: impl AsRef<Path>) -> Result<Dataset<PointRecord>> {
    let file = File::open(path)?;
    load_point_records(BufReader::new(file))
}

/// Opens a file and loads snapshots from it
pub fn load_snapshots_from_path(path: impl AsRef<Path>) -> Result<Dataset<GridSnapshot>> {
    let file = File::open(path)?;
    load_snapshots(BufReader::new(file))
}

fn read_lines<R, T, F>(reader: R, kind: &str, mut parse: F) -> Result<Dataset<T>>
where
    R: BufRead,
    F: FnMut(&str) -> std::result::Result<T, String>,
{
    let mut records = Vec::new();
    let mut skipped = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse(trimmed) {
            Ok(record) => records.push(record),
            Err(reason) => {
                skipped += 1;
                tracing::warn!("skipping {} line {}: {}", kind, line_no + 1, reason);
            }
        }
    }

    tracing::debug!(kind, accepted = records.len(), skipped, "loaded feed");
    Ok(Dataset { records, skipped })
}

/// Interprets a JSON timestamp: a string in one of the known formats, or a
/// number of Unix seconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_time_str(s),
        Value::Number(n) => n.as_f64().and_then(from_unix_seconds),
        _ => None,
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

/// Glider telemetry splits its time into separate `date` and `time` fields
fn split_date_time(extras: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let date = extras.get("date")?.as_str()?;
    let time = extras.get("time")?.as_str()?;
    parse_time_str(&format!("{} {}", date, time))
}
