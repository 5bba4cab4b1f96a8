//! Frame data structures: the fused unit handed to renderers

use crate::{GridSnapshot, PointRecord};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;

/// One timeline step: a wave-field snapshot with the typhoon fix and glider
/// positions that fall close enough to it in time
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// Position in the frame sequence; equals `snapshot.index`
    pub index: usize,
    /// Frame time, taken from the snapshot
    pub timestamp: DateTime<Utc>,
    /// Backbone snapshot for this frame
    pub snapshot: GridSnapshot,
    /// Nearest hazard fix within tolerance
    pub hazard_center: Option<Arc<PointRecord>>,
    /// Every asset fix inside the window, in input order
    pub asset_points: Vec<Arc<PointRecord>>,
}

impl Frame {
    /// Returns true if a hazard fix was attached
    pub fn has_hazard(&self) -> bool {
        self.hazard_center.is_some()
    }

    /// Returns true if neither hazard nor asset records were attached
    pub fn is_bare(&self) -> bool {
        self.hazard_center.is_none() && self.asset_points.is_empty()
    }
}

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, or `None` if `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Smallest range covering every timestamp, `None` for an empty iterator
    pub fn spanning<I>(timestamps: I) -> Option<Self>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        timestamps.into_iter().fold(None, |range, ts| match range {
            None => Some(Self { start: ts, end: ts }),
            Some(r) => Some(Self {
                start: r.start.min(ts),
                end: r.end.max(ts),
            }),
        })
    }

    /// Length of the range
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Checks if the timestamp lies inside the range (bounds included)
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
