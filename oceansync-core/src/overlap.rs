//! Temporal coverage of the three series and where they overlap

use crate::TimeRange;
use serde::Serialize;

/// Intersection of the non-empty series ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Overlap {
    /// Fewer than two series have any timestamped record
    NotEnoughSeries,
    /// The ranges do not share a common instant
    Disjoint,
    /// Common interval shared by every non-empty series
    Overlapping(TimeRange),
}

impl Overlap {
    /// Intersects the ranges that are present
    pub fn of(ranges: &[Option<TimeRange>]) -> Self {
        let present: Vec<&TimeRange> = ranges.iter().flatten().collect();
        if present.len() < 2 {
            return Overlap::NotEnoughSeries;
        }

        let start = present.iter().map(|r| r.start).max();
        let end = present.iter().map(|r| r.end).min();
        match (start, end) {
            (Some(start), Some(end)) => TimeRange::new(start, end)
                .map(Overlap::Overlapping)
                .unwrap_or(Overlap::Disjoint),
            _ => Overlap::NotEnoughSeries,
        }
    }

    /// The overlapping interval, if any
    pub fn range(&self) -> Option<TimeRange> {
        match self {
            Overlap::Overlapping(range) => Some(*range),
            _ => None,
        }
    }
}

/// Per-series coverage report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapReport {
    /// Coverage of the glider (asset) series
    pub asset_range: Option<TimeRange>,
    /// Coverage of the typhoon (hazard) series
    pub hazard_range: Option<TimeRange>,
    /// Coverage of the wave-field (snapshot) series
    pub snapshot_range: Option<TimeRange>,
    /// Where all non-empty series overlap
    pub intersection: Overlap,
}

impl OverlapReport {
    pub fn new(
        asset_range: Option<TimeRange>,
        hazard_range: Option<TimeRange>,
        snapshot_range: Option<TimeRange>,
    ) -> Self {
        let intersection = Overlap::of(&[asset_range, hazard_range, snapshot_range]);
        Self {
            asset_range,
            hazard_range,
            snapshot_range,
            intersection,
        }
    }
}
