//! Time-sorted lookup over a point series
//!
//! Both lookups answer in terms of input positions so callers can keep
//! "first in input order" semantics while searching in time order.

use crate::PointRecord;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

/// Matchable records of one series, sorted by `(timestamp, input position)`
pub(crate) struct TimeIndex {
    entries: Vec<(DateTime<Utc>, usize)>,
}

impl TimeIndex {
    /// Indexes every matchable record; malformed records are left out
    pub fn new(records: &[Arc<PointRecord>]) -> Self {
        let mut entries: Vec<(DateTime<Utc>, usize)> = records
            .iter()
            .enumerate()
            .filter_map(|(pos, record)| record.matchable_time().map(|ts| (ts, pos)))
            .collect();
        entries.sort_unstable();
        Self { entries }
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Input position of the record closest to `target`, if its distance is
    /// within `tolerance`. Equal distances resolve to the earliest position.
    pub fn nearest(&self, target: DateTime<Utc>, tolerance: TimeDelta) -> Option<usize> {
        let split = self.entries.partition_point(|(ts, _)| *ts < target);

        // Each side contributes the first record of its closest timestamp
        // group, which is also the lowest input position within that group.
        let after = self.entries.get(split).map(|&(ts, pos)| (ts - target, pos));
        let before = split.checked_sub(1).map(|last| {
            let ts = self.entries[last].0;
            let group_start = self.entries.partition_point(|(t, _)| *t < ts);
            (target - ts, self.entries[group_start].1)
        });

        let (diff, pos) = match (before, after) {
            (Some(b), Some(a)) => b.min(a),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => return None,
        };

        (diff <= tolerance).then_some(pos)
    }

    /// Input positions of every record within `±window` of `target`
    /// (bounds included), in input order
    pub fn within(&self, target: DateTime<Utc>, window: TimeDelta) -> Vec<usize> {
        let lower = target
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let upper = target
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let start = self.entries.partition_point(|(ts, _)| *ts < lower);
        let end = self.entries.partition_point(|(ts, _)| *ts <= upper);

        let mut positions: Vec<usize> = self.entries[start..end].iter().map(|&(_, pos)| pos).collect();
        positions.sort_unstable();
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 8, 5, 0, 0, 0).unwrap()
    }

    fn at_minutes(minutes: i64) -> DateTime<Utc> {
        base() + TimeDelta::minutes(minutes)
    }

    fn series(minutes: &[i64]) -> Vec<Arc<PointRecord>> {
        minutes
            .iter()
            .enumerate()
            .map(|(i, &m)| Arc::new(PointRecord::new(i as i64, at_minutes(m), 120.0, 25.0)))
            .collect()
    }

    /// Reference scan: first record in input order with the minimal distance
    fn brute_nearest(records: &[Arc<PointRecord>], target: DateTime<Utc>, tolerance: TimeDelta) -> Option<usize> {
        let mut best: Option<(TimeDelta, usize)> = None;
        for (pos, record) in records.iter().enumerate() {
            let Some(ts) = record.matchable_time() else { continue };
            let diff = (target - ts).abs();
            if best.map_or(true, |(d, _)| diff < d) {
                best = Some((diff, pos));
            }
        }
        best.filter(|(d, _)| *d <= tolerance).map(|(_, pos)| pos)
    }

    #[test]
    fn test_nearest_picks_smallest_distance() {
        let records = series(&[200, 5, 90]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.nearest(at_minutes(0), TimeDelta::hours(2)), Some(1));
        assert_eq!(index.nearest(at_minutes(150), TimeDelta::hours(2)), Some(0));
    }

    #[test]
    fn test_nearest_tie_goes_to_first_in_input_order() {
        // 10 minutes after and 10 minutes before, the later fix listed first
        let records = series(&[70, 50]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.nearest(at_minutes(60), TimeDelta::hours(2)), Some(0));

        let records = series(&[50, 70]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.nearest(at_minutes(60), TimeDelta::hours(2)), Some(0));
    }

    #[test]
    fn test_nearest_duplicate_timestamps_keep_input_order() {
        let records = series(&[30, 10, 30, 10]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.nearest(at_minutes(12), TimeDelta::hours(2)), Some(1));
        assert_eq!(index.nearest(at_minutes(28), TimeDelta::hours(2)), Some(0));
    }

    #[test]
    fn test_nearest_respects_tolerance_boundary() {
        let records = series(&[120]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.nearest(at_minutes(0), TimeDelta::hours(2)), Some(0));
        assert_eq!(index.nearest(at_minutes(-1), TimeDelta::hours(2)), None);
    }

    #[test]
    fn test_nearest_matches_reference_scan() {
        let records = series(&[40, -15, 40, 300, 95, 95, -15, 180, 0]);
        let index = TimeIndex::new(&records);
        for target in (-200..500).step_by(7) {
            let target = at_minutes(target);
            assert_eq!(
                index.nearest(target, TimeDelta::hours(2)),
                brute_nearest(&records, target, TimeDelta::hours(2)),
                "target {}",
                target
            );
        }
    }

    #[test]
    fn test_within_is_inclusive_and_in_input_order() {
        let records = series(&[61, -10, 31, 0, 30, -31, 59]);
        let index = TimeIndex::new(&records);
        assert_eq!(index.within(at_minutes(0), TimeDelta::minutes(30)), vec![1, 3, 4]);
        assert_eq!(index.within(at_minutes(60), TimeDelta::minutes(30)), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_malformed_records_are_not_indexed() {
        let mut records = series(&[0, 5]);
        Arc::make_mut(&mut records[0]).timestamp = None;
        Arc::make_mut(&mut records[1]).longitude = None;
        let index = TimeIndex::new(&records);
        assert_eq!(index.len(), 0);
        assert_eq!(index.nearest(at_minutes(0), TimeDelta::hours(2)), None);
        assert!(index.within(at_minutes(0), TimeDelta::minutes(30)).is_empty());
    }
}
