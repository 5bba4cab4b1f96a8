//! OceanSync Player Library
//!
//! This library plays a fused frame sequence back at a user-controlled rate.
//! Timing is driven by a [`RepaintHost`]: the scheduler asks for one repaint
//! callback at a time and fires at most one advance per callback, so the
//! playback rate is independent of how often the host actually repaints.

pub mod controller;
pub mod host;
pub mod metrics;
pub mod scheduler;

pub use controller::{FrameListener, PlaybackController};
pub use host::{ManualHost, RepaintHost, SystemHost, TickHandle};
pub use metrics::{PlaybackMetrics, PlaybackReport};
pub use scheduler::{Advance, FrameInterval, FrameScheduler, MetricsListener, TickOutcome};

use std::time::Duration;

/// Result type for oceansync-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for oceansync-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Frame interval must be positive, got {0:?}")]
    InvalidInterval(Duration),
}
