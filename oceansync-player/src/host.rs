//! Repaint hosts: the "run this again before the next visual update"
//! capability that drives the scheduler

use std::thread;
use std::time::{Duration, Instant};

/// Default repaint period of [`SystemHost`] (60 Hz)
pub const DEFAULT_REPAINT_PERIOD: Duration = Duration::from_micros(16_667);

/// Identifies one requested repaint callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    /// Raw sequence number of the request
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Host-side repaint loop as seen by the scheduler.
///
/// The scheduler requests a callback with [`request_tick`](Self::request_tick);
/// the host later hands the returned handle back to whoever owns the
/// scheduler (see [`crate::PlaybackController::on_repaint`]).
pub trait RepaintHost {
    /// Monotonic time since the host's origin
    fn now(&self) -> Duration;

    /// Requests one repaint callback
    fn request_tick(&mut self) -> TickHandle;

    /// Cancels a pending request; unknown handles are ignored
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// Host with a virtual clock, stepped explicitly by the caller
#[derive(Debug, Default)]
pub struct ManualHost {
    now: Duration,
    next_id: u64,
    pending: Option<TickHandle>,
    requests: u64,
}

impl ManualHost {
    /// Creates a host with its clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the virtual clock forward
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Request that has not been delivered or cancelled yet
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Takes the pending request for delivery
    pub fn take_pending(&mut self) -> Option<TickHandle> {
        self.pending.take()
    }

    /// Total number of requests made so far
    pub fn request_count(&self) -> u64 {
        self.requests
    }
}

impl RepaintHost for ManualHost {
    fn now(&self) -> Duration {
        self.now
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        self.requests += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

/// Wall-clock host that repaints at a fixed period
#[derive(Debug)]
pub struct SystemHost {
    origin: Instant,
    period: Duration,
    next_repaint: Instant,
    next_id: u64,
    pending: Option<TickHandle>,
}

impl SystemHost {
    /// Creates a host repainting every `period`
    pub fn with_period(period: Duration) -> Self {
        let origin = Instant::now();
        Self {
            origin,
            period,
            next_repaint: origin + period,
            next_id: 0,
            pending: None,
        }
    }

    /// Repaint period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleeps until the next repaint boundary and returns the request to
    /// deliver. Returns immediately with `None` when nothing is pending.
    pub fn wait_for_repaint(&mut self) -> Option<TickHandle> {
        let handle = self.pending.take()?;

        let now = Instant::now();
        if self.next_repaint > now {
            thread::sleep(self.next_repaint - now);
        }
        self.next_repaint += self.period;

        // After a stall, resume on the next boundary instead of bursting
        let now = Instant::now();
        if self.next_repaint < now {
            self.next_repaint = now + self.period;
        }

        Some(handle)
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::with_period(DEFAULT_REPAINT_PERIOD)
    }
}

impl RepaintHost for SystemHost {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_cancel_only_matching_handle() {
        let mut host = ManualHost::new();
        let first = host.request_tick();
        let second = host.request_tick();
        assert_ne!(first, second);

        host.cancel_tick(first);
        assert_eq!(host.pending(), Some(second));

        host.cancel_tick(second);
        assert_eq!(host.pending(), None);
        assert_eq!(host.request_count(), 2);
    }

    #[test]
    fn test_manual_host_clock() {
        let mut host = ManualHost::new();
        host.advance(Duration::from_millis(16));
        host.advance(Duration::from_millis(16));
        assert_eq!(host.now(), Duration::from_millis(32));
    }

    #[test]
    fn test_system_host_waits_one_period() {
        let mut host = SystemHost::with_period(Duration::from_millis(5));
        assert!(host.wait_for_repaint().is_none());

        let handle = host.request_tick();
        let before = host.now();
        assert_eq!(host.wait_for_repaint(), Some(handle));
        assert!(host.now() >= before);
        assert!(host.wait_for_repaint().is_none());
    }
}
