//! Playback rate metrics and completion accounting

use std::fmt;
use std::time::Duration;

/// Number of advances between two metric reports
pub const METRICS_WINDOW: u32 = 30;

/// Accuracy (percent) at or above which playback counts as stable
pub const STABLE_ACCURACY: f64 = 90.0;

/// Measured playback rate against the requested one
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackMetrics {
    /// Rate implied by the current interval
    pub target_fps: f64,
    /// Rate measured over the last window
    pub actual_fps: f64,
    /// 100 minus the relative error, floored at 0
    pub frame_accuracy: f64,
    /// Whether `frame_accuracy` reaches [`STABLE_ACCURACY`]
    pub is_stable: bool,
}

impl PlaybackMetrics {
    /// Zeroed snapshot reported when the scheduler is not running
    pub fn idle() -> Self {
        Self::default()
    }

    /// Computes metrics for `frames` advances over `elapsed`; `None` if no
    /// time has elapsed
    pub fn measure(frames: u32, elapsed: Duration, interval: Duration) -> Option<Self> {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let interval_ms = interval.as_secs_f64() * 1000.0;
        if elapsed_ms <= 0.0 || interval_ms <= 0.0 {
            return None;
        }

        let actual_fps = f64::from(frames) * 1000.0 / elapsed_ms;
        let target_fps = 1000.0 / interval_ms;
        let frame_accuracy = (100.0 - (actual_fps - target_fps).abs() / target_fps * 100.0).max(0.0);

        Some(Self {
            target_fps,
            actual_fps,
            frame_accuracy,
            is_stable: frame_accuracy >= STABLE_ACCURACY,
        })
    }
}

impl fmt::Display for PlaybackMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {:.1}fps, actual {:.1}fps, accuracy {:.0}%{}",
            self.target_fps,
            self.actual_fps,
            self.frame_accuracy,
            if self.is_stable { "" } else { " (unstable)" }
        )
    }
}

/// Counts advances and emits metrics every [`METRICS_WINDOW`] of them
#[derive(Debug, Default)]
pub(crate) struct FpsCounter {
    frames: u32,
    window_start: Duration,
}

impl FpsCounter {
    pub fn reset(&mut self, now: Duration) {
        self.frames = 0;
        self.window_start = now;
    }

    /// Records one advance at `now`
    pub fn record(&mut self, now: Duration, interval: Duration) -> Option<PlaybackMetrics> {
        self.frames += 1;
        if self.frames % METRICS_WINDOW != 0 {
            return None;
        }

        let metrics = PlaybackMetrics::measure(self.frames, now.saturating_sub(self.window_start), interval)?;
        self.reset(now);
        Some(metrics)
    }
}

/// Wall-clock accounting of one play-through, for diagnostics only
#[derive(Debug, Default)]
pub struct PlayTimer {
    started_at: Option<Duration>,
    total_frames: usize,
}

impl PlayTimer {
    pub(crate) fn start(&mut self, now: Duration, total_frames: usize) {
        self.started_at = Some(now);
        self.total_frames = total_frames;
    }

    /// Restarts accounting at `now`, keeping the frame count
    pub fn reset(&mut self, now: Duration) {
        self.started_at = Some(now);
    }

    /// Builds and logs the report for a play-through ending on
    /// `last_frame_index`; `None` if playback never started
    pub fn complete(&self, now: Duration, interval: Duration, last_frame_index: usize) -> Option<PlaybackReport> {
        let started_at = self.started_at?;
        let expected = interval.saturating_mul(u32::try_from(self.total_frames).unwrap_or(u32::MAX));
        let actual = now.saturating_sub(started_at);

        let report = PlaybackReport {
            frames_played: last_frame_index + 1,
            total_frames: self.total_frames,
            interval,
            actual,
            expected,
        };
        tracing::info!("playback complete: {}", report);
        Some(report)
    }
}

/// Summary of a play-through: actual against expected duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackReport {
    /// Frames shown, counting from the first
    pub frames_played: usize,
    /// Frames in the timeline
    pub total_frames: usize,
    /// Interval in effect when the report was taken
    pub interval: Duration,
    /// Measured duration since playback (or the loop) started
    pub actual: Duration,
    /// `total_frames * interval`
    pub expected: Duration,
}

impl PlaybackReport {
    /// Relative error of the actual duration, in percent
    pub fn deviation_percent(&self) -> f64 {
        let expected = self.expected.as_secs_f64();
        if expected > 0.0 {
            (self.actual.as_secs_f64() - expected).abs() / expected * 100.0
        } else {
            0.0
        }
    }

    /// Frames shown per second of wall time
    pub fn average_fps(&self) -> f64 {
        let actual = self.actual.as_secs_f64();
        if actual > 0.0 {
            self.frames_played as f64 / actual
        } else {
            0.0
        }
    }
}

impl fmt::Display for PlaybackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} frames at {}ms - took {}, expected {} ({:.1}% off, {:.1}fps)",
            self.frames_played,
            self.total_frames,
            self.interval.as_millis(),
            format_duration(self.actual),
            format_duration(self.expected),
            self.deviation_percent(),
            self.average_fps(),
        )
    }
}

/// Renders a playback duration with millisecond precision
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    match millis {
        0..=999 => format!("{}ms", millis),
        1_000..=59_999 => format!("{}.{:03}s", millis / 1_000, millis % 1_000),
        _ => {
            let secs = millis / 1_000;
            format!("{}m {:02}.{:03}s", secs / 60, secs % 60, millis % 1_000)
        }
    }
}
