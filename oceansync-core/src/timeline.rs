//! Timeline synchronization: fuses the three series into frames
//!
//! The wave-field snapshots are the backbone of the timeline. Every snapshot
//! becomes one frame, carrying the closest typhoon fix (within the hazard
//! tolerance) and all glider fixes inside the asset window.

use crate::matching::TimeIndex;
use crate::overlap::OverlapReport;
use crate::{Error, Frame, GridSnapshot, PointRecord, Result, SyncConfig, TimeRange};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

/// Owns the raw series and the frame sequence built from them
#[derive(Debug)]
pub struct TimelineService {
    config: SyncConfig,
    assets: Vec<Arc<PointRecord>>,
    hazards: Vec<Arc<PointRecord>>,
    snapshots: Vec<GridSnapshot>,
    frames: Arc<[Frame]>,
}

impl TimelineService {
    /// Creates an empty service with the given tolerances
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            assets: Vec::new(),
            hazards: Vec::new(),
            snapshots: Vec::new(),
            frames: Arc::from(Vec::new()),
        }
    }

    /// Returns the active tolerances
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Replaces all three series and rebuilds the frame sequence.
    ///
    /// Asset and hazard records may arrive in any order. Snapshots are taken
    /// in the given order and each must carry its position as `index`; on a
    /// mismatch nothing is replaced.
    pub fn build(
        &mut self,
        assets: Vec<PointRecord>,
        hazards: Vec<PointRecord>,
        snapshots: Vec<GridSnapshot>,
    ) -> Result<Arc<[Frame]>> {
        if let Some((position, snapshot)) = snapshots
            .iter()
            .enumerate()
            .find(|(position, snapshot)| snapshot.index != *position)
        {
            return Err(Error::SnapshotIndexMismatch {
                position,
                index: snapshot.index,
            });
        }

        self.assets = assets.into_iter().map(Arc::new).collect();
        self.hazards = hazards.into_iter().map(Arc::new).collect();
        self.snapshots = snapshots;
        self.frames = self.synchronize().into();

        Ok(self.frames())
    }

    fn synchronize(&self) -> Vec<Frame> {
        if let Some(pair) = self
            .snapshots
            .windows(2)
            .find(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            tracing::warn!(
                "snapshot {} ({}) precedes snapshot {} ({}); frames keep snapshot order",
                pair[1].index,
                pair[1].time_label,
                pair[0].index,
                pair[0].time_label
            );
        }

        let hazard_index = TimeIndex::new(&self.hazards);
        let asset_index = TimeIndex::new(&self.assets);

        let skipped_hazards = self.hazards.len() - hazard_index.len();
        let skipped_assets = self.assets.len() - asset_index.len();
        if skipped_hazards > 0 || skipped_assets > 0 {
            tracing::debug!(
                skipped_hazards,
                skipped_assets,
                "malformed records excluded from matching"
            );
        }

        let frames: Vec<Frame> = self
            .snapshots
            .iter()
            .map(|snapshot| {
                let ts = snapshot.timestamp;
                let hazard_center = hazard_index
                    .nearest(ts, self.config.hazard_tolerance())
                    .map(|pos| Arc::clone(&self.hazards[pos]));
                let asset_points = asset_index
                    .within(ts, self.config.asset_window())
                    .into_iter()
                    .map(|pos| Arc::clone(&self.assets[pos]))
                    .collect();

                Frame {
                    index: snapshot.index,
                    timestamp: ts,
                    snapshot: snapshot.clone(),
                    hazard_center,
                    asset_points,
                }
            })
            .collect();

        tracing::debug!(
            frames = frames.len(),
            with_hazard = frames.iter().filter(|f| f.has_hazard()).count(),
            "rebuilt timeline"
        );

        frames
    }

    /// Read-only view of the current frame sequence
    pub fn frames(&self) -> Arc<[Frame]> {
        Arc::clone(&self.frames)
    }

    /// Gets a frame by index
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Total number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frames have been built
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame whose timestamp is closest to `target`; the earlier frame wins
    /// a tie. Returns `None` only for an empty timeline.
    pub fn find_frame_by_timestamp(&self, target: DateTime<Utc>) -> Option<&Frame> {
        let mut best: Option<(TimeDelta, &Frame)> = None;
        for frame in self.frames.iter() {
            let diff = (target - frame.timestamp).abs();
            if best.map_or(true, |(min, _)| diff < min) {
                best = Some((diff, frame));
            }
        }
        best.map(|(_, frame)| frame)
    }

    /// Time coverage of each series and their common interval
    pub fn analyze_overlap(&self) -> OverlapReport {
        OverlapReport::new(
            TimeRange::spanning(self.assets.iter().filter_map(|r| r.timestamp)),
            TimeRange::spanning(self.hazards.iter().filter_map(|r| r.timestamp)),
            TimeRange::spanning(self.snapshots.iter().map(|s| s.timestamp)),
        )
    }

    /// Mean spacing between consecutive frames; zero with fewer than two
    pub fn frame_interval(&self) -> TimeDelta {
        let (Some(first), Some(last)) = (self.frames.first(), self.frames.last()) else {
            return TimeDelta::zero();
        };
        let steps = self.frames.len() - 1;
        if steps == 0 {
            return TimeDelta::zero();
        }
        // Consecutive deltas telescope to last - first
        let total = last.timestamp - first.timestamp;
        total / i32::try_from(steps).unwrap_or(i32::MAX)
    }

    /// Span covered by the frames.
    ///
    /// This is the first to the last frame when snapshots are in time order.
    /// Out-of-order snapshots are accepted by [`build`](Self::build), so the
    /// range is taken over the earliest and latest frame to stay well formed.
    pub fn time_range(&self) -> Option<TimeRange> {
        TimeRange::spanning(self.frames.iter().map(|f| f.timestamp))
    }
}

impl Default for TimelineService {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Overlap;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 8, 5, 8, 0, 0).unwrap()
    }

    fn at_minutes(minutes: i64) -> DateTime<Utc> {
        base() + TimeDelta::minutes(minutes)
    }

    fn points(prefix: &str, minutes: &[i64]) -> Vec<PointRecord> {
        minutes
            .iter()
            .map(|&m| PointRecord::new(format!("{}{}", prefix, m), at_minutes(m), 123.0, 26.0))
            .collect()
    }

    fn snapshots(minutes: &[i64]) -> Vec<GridSnapshot> {
        minutes
            .iter()
            .enumerate()
            .map(|(i, &m)| GridSnapshot::new(i, format!("snap-{}", m), at_minutes(m)))
            .collect()
    }

    fn ids(records: &[Arc<PointRecord>]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_one_frame_per_snapshot() {
        let mut service = TimelineService::default();
        let frames = service
            .build(Vec::new(), Vec::new(), snapshots(&[0, 60, 120, 180]))
            .unwrap();
        assert_eq!(frames.len(), 4);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.snapshot.index, i);
            assert!(frame.is_bare());
        }
    }

    #[test]
    fn test_hazard_dropped_beyond_tolerance() {
        let mut service = TimelineService::default();
        let frames = service
            .build(Vec::new(), points("h", &[5, 200]), snapshots(&[0, 60, 120, 400]))
            .unwrap();

        assert_eq!(frames[0].hazard_center.as_ref().unwrap().id.to_string(), "h5");
        assert_eq!(frames[1].hazard_center.as_ref().unwrap().id.to_string(), "h5");
        // 80 minutes to h200 versus 115 to h5
        assert_eq!(frames[2].hazard_center.as_ref().unwrap().id.to_string(), "h200");
        // 200 minutes from the nearest fix
        assert!(frames[3].hazard_center.is_none());
    }

    #[test]
    fn test_custom_tolerances() {
        let config = SyncConfig::from_minutes(10, 5).unwrap();
        let mut service = TimelineService::new(config);
        let frames = service
            .build(points("a", &[-6, -5, 5, 6]), points("h", &[11]), snapshots(&[0]))
            .unwrap();
        assert!(frames[0].hazard_center.is_none());
        assert_eq!(ids(&frames[0].asset_points), vec!["a-5", "a5"]);
    }

    #[test]
    fn test_malformed_records_never_attach() {
        let mut assets = points("a", &[0, 1]);
        assets[0].timestamp = None;
        let mut hazards = points("h", &[0]);
        hazards[0].latitude = None;

        let mut service = TimelineService::default();
        let frames = service.build(assets, hazards, snapshots(&[0])).unwrap();
        assert_eq!(ids(&frames[0].asset_points), vec!["a1"]);
        assert!(frames[0].hazard_center.is_none());
    }

    #[test]
    fn test_index_mismatch_rejected_without_clobbering() {
        let mut service = TimelineService::default();
        service.build(Vec::new(), Vec::new(), snapshots(&[0, 60])).unwrap();

        let mut bad = snapshots(&[0, 60, 120]);
        bad[2].index = 7;
        let err = service.build(Vec::new(), Vec::new(), bad).unwrap_err();
        assert!(matches!(err, Error::SnapshotIndexMismatch { position: 2, index: 7 }));
        assert_eq!(service.frame_count(), 2);
    }

    #[test]
    fn test_out_of_order_snapshots_keep_their_order() {
        let mut service = TimelineService::default();
        let frames = service
            .build(Vec::new(), Vec::new(), snapshots(&[60, 0]))
            .unwrap();
        assert_eq!(frames[0].timestamp, at_minutes(60));
        assert_eq!(frames[1].timestamp, at_minutes(0));
    }

    #[test]
    fn test_find_frame_by_timestamp() {
        let mut service = TimelineService::default();
        assert!(service.find_frame_by_timestamp(base()).is_none());

        service.build(Vec::new(), Vec::new(), snapshots(&[0, 60, 120])).unwrap();
        assert_eq!(service.find_frame_by_timestamp(at_minutes(-500)).unwrap().index, 0);
        assert_eq!(service.find_frame_by_timestamp(at_minutes(70)).unwrap().index, 1);
        assert_eq!(service.find_frame_by_timestamp(at_minutes(10_000)).unwrap().index, 2);
        // Equidistant between frames 0 and 1
        assert_eq!(service.find_frame_by_timestamp(at_minutes(30)).unwrap().index, 0);
    }

    #[test]
    fn test_frame_interval() {
        let mut service = TimelineService::default();
        assert_eq!(service.frame_interval(), TimeDelta::zero());

        service.build(Vec::new(), Vec::new(), snapshots(&[0])).unwrap();
        assert_eq!(service.frame_interval(), TimeDelta::zero());

        service.build(Vec::new(), Vec::new(), snapshots(&[0, 60, 180])).unwrap();
        assert_eq!(service.frame_interval(), TimeDelta::minutes(90));
    }

    #[test]
    fn test_analyze_overlap() {
        let mut service = TimelineService::default();
        service
            .build(points("a", &[30, -20, 90]), points("h", &[0, 400]), snapshots(&[10, 60, 120]))
            .unwrap();

        let report = service.analyze_overlap();
        assert_eq!(report.asset_range, TimeRange::new(at_minutes(-20), at_minutes(90)));
        assert_eq!(report.hazard_range, TimeRange::new(at_minutes(0), at_minutes(400)));
        assert_eq!(report.snapshot_range, TimeRange::new(at_minutes(10), at_minutes(120)));
        assert_eq!(
            report.intersection,
            Overlap::Overlapping(TimeRange::new(at_minutes(10), at_minutes(90)).unwrap())
        );
    }

    #[test]
    fn test_analyze_overlap_with_only_snapshots() {
        let mut service = TimelineService::default();
        service.build(Vec::new(), Vec::new(), snapshots(&[0, 60])).unwrap();
        assert_eq!(service.analyze_overlap().intersection, Overlap::NotEnoughSeries);
    }

    #[test]
    fn test_time_range() {
        let mut service = TimelineService::default();
        assert!(service.time_range().is_none());
        service.build(Vec::new(), Vec::new(), snapshots(&[0, 60, 120])).unwrap();
        let range = service.time_range().unwrap();
        assert_eq!(range.start, at_minutes(0));
        assert_eq!(range.end, at_minutes(120));
    }

    #[test]
    fn test_time_range_with_out_of_order_snapshots() {
        let mut service = TimelineService::default();
        service.build(Vec::new(), Vec::new(), snapshots(&[60, 0, 120, 30])).unwrap();
        let range = service.time_range().unwrap();
        assert_eq!(range.start, at_minutes(0));
        assert_eq!(range.end, at_minutes(120));
        assert!(range.duration() >= TimeDelta::zero());
    }

    #[test]
    fn test_rebuild_replaces_frames_wholesale() {
        let mut service = TimelineService::default();
        let first = service.build(Vec::new(), Vec::new(), snapshots(&[0, 60])).unwrap();
        let second = service.build(Vec::new(), Vec::new(), snapshots(&[0])).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(service.frame_count(), 1);
    }
}
