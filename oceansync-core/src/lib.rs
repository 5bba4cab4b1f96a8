//! OceanSync Core Library
//!
//! This library provides the record model for the three observation series
//! (glider telemetry, typhoon track, wave-field snapshots), the timeline
//! synchronization service that fuses them into frames, and JSONL loading
//! for the raw feeds.

pub mod config;
pub mod dataset;
pub mod frame;
mod matching;
pub mod overlap;
pub mod record;
pub mod timeline;

pub use config::SyncConfig;
pub use dataset::Dataset;
pub use frame::{Frame, TimeRange};
pub use overlap::{Overlap, OverlapReport};
pub use record::{GridSnapshot, PointRecord, RecordId};
pub use timeline::TimelineService;

/// Result type for oceansync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for oceansync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot at position {position} carries index {index}")]
    SnapshotIndexMismatch { position: usize, index: usize },

    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid time label: {0}")]
    InvalidTimeLabel(String),
}
