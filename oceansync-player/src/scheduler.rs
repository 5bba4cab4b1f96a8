//! Frame-accurate advance scheduling on top of a repaint host

use crate::host::{RepaintHost, TickHandle};
use crate::metrics::{FpsCounter, PlayTimer, PlaybackMetrics, PlaybackReport};
use crate::{Error, Result};
use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;

/// Listener for periodic playback metrics
pub type MetricsListener = Box<dyn FnMut(&PlaybackMetrics)>;

/// Positive time between two advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameInterval(Duration);

impl FrameInterval {
    /// Interval used when none is configured
    pub const DEFAULT_MILLIS: u64 = 500;

    /// Creates an interval, rejecting zero
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval(interval));
        }
        Ok(Self(interval))
    }

    /// Creates an interval from milliseconds, rejecting zero
    pub fn from_millis(millis: u64) -> Result<Self> {
        Self::new(Duration::from_millis(millis))
    }

    /// The interval as a duration
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Advances per second at this interval
    pub fn target_fps(&self) -> f64 {
        1.0 / self.0.as_secs_f64()
    }
}

impl Default for FrameInterval {
    fn default() -> Self {
        Self(Duration::from_millis(Self::DEFAULT_MILLIS))
    }
}

impl fmt::Display for FrameInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

/// What a delivered repaint callback did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The handle was cancelled, superseded, or the scheduler is idle
    Stale,
    /// Deadline not reached; the next repaint was requested
    Waiting,
    /// One advance fired and the next repaint was requested
    Advanced,
    /// One advance fired and asked the scheduler to stop
    Stopped,
}

/// Context handed to the advance callback
pub struct Advance<'a> {
    now: Duration,
    interval: Duration,
    timer: &'a mut PlayTimer,
}

impl Advance<'_> {
    /// Host time at which the advance fired
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Reports the play-through that ends on `last_frame_index`
    pub fn log_playback_complete(&self, last_frame_index: usize) -> Option<PlaybackReport> {
        self.timer.complete(self.now, self.interval, last_frame_index)
    }

    /// Restarts completion accounting, e.g. when a loop wraps
    pub fn reset_play_timer(&mut self) {
        self.timer.reset(self.now);
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Running {
        deadline: Duration,
        /// Only this handle may fire; anything else is stale
        pending: TickHandle,
    },
}

/// Fires advances at a fixed interval, at most one per repaint.
///
/// After each advance the next deadline is computed from the current time
/// rather than the previous deadline, so a stalled host produces one late
/// advance instead of a burst of catch-up advances.
pub struct FrameScheduler<H: RepaintHost> {
    host: H,
    interval: FrameInterval,
    state: State,
    counter: FpsCounter,
    timer: PlayTimer,
    on_metrics: Option<MetricsListener>,
    last_metrics: PlaybackMetrics,
}

impl<H: RepaintHost> FrameScheduler<H> {
    /// Creates an idle scheduler on the given host
    pub fn new(host: H) -> Self {
        Self {
            host,
            interval: FrameInterval::default(),
            state: State::Idle,
            counter: FpsCounter::default(),
            timer: PlayTimer::default(),
            on_metrics: None,
            last_metrics: PlaybackMetrics::idle(),
        }
    }

    /// Installs the metrics listener, replacing any previous one
    pub fn set_metrics_listener(&mut self, listener: impl FnMut(&PlaybackMetrics) + 'static) {
        self.on_metrics = Some(Box::new(listener));
    }

    /// Starts (or restarts) firing every `interval`.
    ///
    /// Any previous run is stopped first. With no frames to play the
    /// scheduler stays idle and `false` is returned.
    pub fn start(&mut self, interval: FrameInterval, total_frames: usize) -> bool {
        self.stop();
        self.interval = interval;

        if total_frames == 0 {
            tracing::debug!("nothing to schedule: timeline is empty");
            return false;
        }

        let now = self.host.now();
        self.counter.reset(now);
        self.timer.start(now, total_frames);
        let pending = self.host.request_tick();
        self.state = State::Running {
            deadline: now + interval.as_duration(),
            pending,
        };

        tracing::debug!(
            "scheduler started: {} per frame, {} frames, expected {:.1}s",
            interval,
            total_frames,
            interval.as_duration().as_secs_f64() * total_frames as f64
        );
        true
    }

    /// Stops firing and reports zeroed metrics. Safe to call when idle.
    pub fn stop(&mut self) {
        if let State::Running { pending, .. } = self.state {
            self.host.cancel_tick(pending);
            tracing::debug!("scheduler stopped");
        }
        self.state = State::Idle;
        self.report(PlaybackMetrics::idle());
    }

    /// Changes the interval used for the next deadline; the deadline already
    /// scheduled is kept. Ignored while idle.
    pub fn update_speed(&mut self, interval: FrameInterval) {
        if self.is_active() {
            tracing::debug!("interval changed to {}", interval);
            self.interval = interval;
        }
    }

    /// Handles one repaint callback delivered by the host.
    ///
    /// `on_advance` runs at most once; returning `ControlFlow::Break` stops
    /// the scheduler before the next repaint is requested.
    pub fn tick<F>(&mut self, handle: TickHandle, mut on_advance: F) -> TickOutcome
    where
        F: FnMut(&mut Advance<'_>) -> ControlFlow<()>,
    {
        let State::Running { deadline, pending } = self.state else {
            return TickOutcome::Stale;
        };
        if pending != handle {
            return TickOutcome::Stale;
        }

        let now = self.host.now();
        if now < deadline {
            let pending = self.host.request_tick();
            self.state = State::Running { deadline, pending };
            return TickOutcome::Waiting;
        }

        let interval = self.interval.as_duration();
        let flow = on_advance(&mut Advance {
            now,
            interval,
            timer: &mut self.timer,
        });

        if let Some(metrics) = self.counter.record(now, interval) {
            tracing::info!("playback rate: {}", metrics);
            self.report(metrics);
        }

        match flow {
            ControlFlow::Break(()) => {
                self.stop();
                TickOutcome::Stopped
            }
            ControlFlow::Continue(()) => {
                let pending = self.host.request_tick();
                self.state = State::Running {
                    deadline: now + self.interval.as_duration(),
                    pending,
                };
                TickOutcome::Advanced
            }
        }
    }

    /// Returns true while running
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Interval currently in effect
    pub fn interval(&self) -> FrameInterval {
        self.interval
    }

    /// Most recently reported metrics
    pub fn last_metrics(&self) -> PlaybackMetrics {
        self.last_metrics
    }

    /// Reports the play-through that ends on `last_frame_index`
    pub fn log_playback_complete(&self, last_frame_index: usize) -> Option<PlaybackReport> {
        self.timer
            .complete(self.host.now(), self.interval.as_duration(), last_frame_index)
    }

    /// Restarts completion accounting at the current time
    pub fn reset_play_timer(&mut self) {
        self.timer.reset(self.host.now());
    }

    /// The repaint host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the repaint host, for pumping repaints
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn report(&mut self, metrics: PlaybackMetrics) {
        self.last_metrics = metrics;
        if let Some(listener) = self.on_metrics.as_mut() {
            listener(&metrics);
        }
    }
}
