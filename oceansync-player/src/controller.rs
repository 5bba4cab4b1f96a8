//! Playback controller: owns the playhead and drives it from the scheduler

use crate::host::{RepaintHost, TickHandle};
use crate::metrics::{PlaybackMetrics, PlaybackReport};
use crate::scheduler::{Advance, FrameInterval, FrameScheduler, TickOutcome};
use chrono::{DateTime, TimeDelta, Utc};
use oceansync_core::Frame;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Listener notified with the newly selected frame
pub type FrameListener = Box<dyn FnMut(&Frame)>;

/// Playhead over an immutable frame view
struct Cursor {
    frames: Arc<[Frame]>,
    index: usize,
    looping: bool,
    on_frame: Option<FrameListener>,
}

impl Cursor {
    fn last(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }

    /// Moves the playhead; notifies only when the index actually changes
    fn select(&mut self, index: usize) -> bool {
        if index == self.index || index >= self.frames.len() {
            return false;
        }
        self.index = index;
        self.notify();
        true
    }

    fn notify(&mut self) {
        if let (Some(listener), Some(frame)) = (self.on_frame.as_mut(), self.frames.get(self.index)) {
            listener(frame);
        }
    }

    fn advance(&mut self, ctx: &mut Advance<'_>) -> ControlFlow<()> {
        let Some(last) = self.last() else {
            return ControlFlow::Break(());
        };

        if self.index >= last {
            if !self.looping {
                return ControlFlow::Break(());
            }
            ctx.log_playback_complete(last);
            ctx.reset_play_timer();
            self.select(0);
            return ControlFlow::Continue(());
        }

        self.select(self.index + 1);
        if self.index == last && !self.looping {
            ctx.log_playback_complete(last);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// User-facing playback over a frame timeline.
///
/// The host delivers the repaint callbacks requested by the scheduler to
/// [`on_repaint`](Self::on_repaint). Everything runs on the caller's thread;
/// listeners fire synchronously from the operation that moved the playhead.
pub struct PlaybackController<H: RepaintHost> {
    scheduler: FrameScheduler<H>,
    cursor: Cursor,
    speed: FrameInterval,
}

impl<H: RepaintHost> PlaybackController<H> {
    /// Creates a stopped controller at frame 0
    pub fn new(host: H, frames: Arc<[Frame]>) -> Self {
        Self {
            scheduler: FrameScheduler::new(host),
            cursor: Cursor {
                frames,
                index: 0,
                looping: false,
                on_frame: None,
            },
            speed: FrameInterval::default(),
        }
    }

    /// Installs the frame-selected listener
    pub fn set_frame_listener(&mut self, listener: impl FnMut(&Frame) + 'static) {
        self.cursor.on_frame = Some(Box::new(listener));
    }

    /// Installs the metrics listener
    pub fn set_metrics_listener(&mut self, listener: impl FnMut(&PlaybackMetrics) + 'static) {
        self.scheduler.set_metrics_listener(listener);
    }

    /// Replaces the timeline. Playback stops, the playhead is clamped into
    /// the new range and the current frame is re-announced.
    pub fn set_frames(&mut self, frames: Arc<[Frame]>) {
        self.scheduler.stop();
        self.cursor.frames = frames;
        self.cursor.index = self.cursor.index.min(self.cursor.last().unwrap_or(0));
        tracing::debug!("timeline replaced: {} frames", self.cursor.frames.len());
        self.cursor.notify();
    }

    /// Starts playback from the current frame. No-op when already playing or
    /// the timeline is empty.
    pub fn play(&mut self) {
        if self.is_playing() || self.cursor.frames.is_empty() {
            return;
        }
        self.scheduler.start(self.speed, self.cursor.frames.len());
    }

    /// Stops advancing, keeping the current frame. Interrupting a running
    /// playback closes its play-through and returns the completion report.
    pub fn pause(&mut self) -> Option<PlaybackReport> {
        if !self.is_playing() {
            return None;
        }
        let report = self.scheduler.log_playback_complete(self.cursor.index);
        self.scheduler.stop();
        report
    }

    /// Stops advancing and rewinds to the first frame
    pub fn stop(&mut self) -> Option<PlaybackReport> {
        let report = self.pause();
        self.cursor.select(0);
        report
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seeks to `index`; out-of-range indices are ignored
    pub fn go_to_frame(&mut self, index: usize) {
        if !self.cursor.select(index) && index >= self.cursor.frames.len() {
            tracing::debug!("ignoring seek to {} of {}", index, self.cursor.frames.len());
        }
    }

    /// Seeks to the frame closest to `target`; the earlier frame wins a tie.
    /// Ignored on an empty timeline.
    pub fn go_to_time(&mut self, target: DateTime<Utc>) {
        let mut best: Option<(TimeDelta, usize)> = None;
        for (index, frame) in self.cursor.frames.iter().enumerate() {
            let diff = (target - frame.timestamp).abs();
            if best.map_or(true, |(min, _)| diff < min) {
                best = Some((diff, index));
            }
        }
        if let Some((_, index)) = best {
            self.cursor.select(index);
        }
    }

    /// Steps forward; wraps when looping, otherwise stays on the last frame
    pub fn next_frame(&mut self) {
        let Some(last) = self.cursor.last() else {
            return;
        };
        if self.cursor.index < last {
            self.cursor.select(self.cursor.index + 1);
        } else if self.cursor.looping {
            self.cursor.select(0);
        }
    }

    /// Steps back; wraps when looping, otherwise stays on the first frame
    pub fn previous_frame(&mut self) {
        let Some(last) = self.cursor.last() else {
            return;
        };
        if self.cursor.index > 0 {
            self.cursor.select(self.cursor.index - 1);
        } else if self.cursor.looping {
            self.cursor.select(last);
        }
    }

    /// Sets the advance interval, applying it to a running playback from the
    /// next advance on
    pub fn set_speed(&mut self, interval: FrameInterval) {
        self.speed = interval;
        self.scheduler.update_speed(interval);
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.cursor.looping = looping;
    }

    /// Host entry point for a delivered repaint callback
    pub fn on_repaint(&mut self, handle: TickHandle) -> TickOutcome {
        let cursor = &mut self.cursor;
        self.scheduler.tick(handle, |ctx| cursor.advance(ctx))
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.cursor.frames.get(self.cursor.index)
    }

    pub fn current_index(&self) -> usize {
        self.cursor.index
    }

    pub fn frame_count(&self) -> usize {
        self.cursor.frames.len()
    }

    pub fn frames(&self) -> &Arc<[Frame]> {
        &self.cursor.frames
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn speed(&self) -> FrameInterval {
        self.speed
    }

    pub fn is_looping(&self) -> bool {
        self.cursor.looping
    }

    /// Most recently reported metrics; zeroed while stopped
    pub fn metrics(&self) -> PlaybackMetrics {
        self.scheduler.last_metrics()
    }

    /// Playhead position as a percentage of the timeline
    pub fn progress(&self) -> f64 {
        match self.cursor.last() {
            Some(last) if last > 0 => self.cursor.index as f64 / last as f64 * 100.0,
            _ => 0.0,
        }
    }

    pub fn scheduler(&self) -> &FrameScheduler<H> {
        &self.scheduler
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.scheduler.host_mut()
    }
}
