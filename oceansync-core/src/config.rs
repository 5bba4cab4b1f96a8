//! Tolerances used when fusing series into frames

use crate::{Error, Result};
use chrono::TimeDelta;

/// Default maximum gap between a snapshot and its hazard fix
pub const DEFAULT_HAZARD_TOLERANCE_MINUTES: i64 = 120;

/// Default half-width of the asset window around a snapshot
pub const DEFAULT_ASSET_WINDOW_MINUTES: i64 = 30;

/// Synchronization tolerances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    hazard_tolerance: TimeDelta,
    asset_window: TimeDelta,
}

impl SyncConfig {
    /// Creates a configuration, rejecting negative tolerances
    pub fn new(hazard_tolerance: TimeDelta, asset_window: TimeDelta) -> Result<Self> {
        if hazard_tolerance < TimeDelta::zero() {
            return Err(Error::InvalidConfig(format!(
                "hazard tolerance must be non-negative, got {}",
                hazard_tolerance
            )));
        }
        if asset_window < TimeDelta::zero() {
            return Err(Error::InvalidConfig(format!(
                "asset window must be non-negative, got {}",
                asset_window
            )));
        }
        Ok(Self {
            hazard_tolerance,
            asset_window,
        })
    }

    /// Creates a configuration from whole minutes
    pub fn from_minutes(hazard_tolerance: i64, asset_window: i64) -> Result<Self> {
        let hazard = TimeDelta::try_minutes(hazard_tolerance).ok_or_else(|| {
            Error::InvalidConfig(format!("hazard tolerance out of range: {} min", hazard_tolerance))
        })?;
        let window = TimeDelta::try_minutes(asset_window).ok_or_else(|| {
            Error::InvalidConfig(format!("asset window out of range: {} min", asset_window))
        })?;
        Self::new(hazard, window)
    }

    /// Maximum gap (inclusive) for attaching a hazard fix
    pub fn hazard_tolerance(&self) -> TimeDelta {
        self.hazard_tolerance
    }

    /// Half-width (inclusive) of the asset window
    pub fn asset_window(&self) -> TimeDelta {
        self.asset_window
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hazard_tolerance: TimeDelta::minutes(DEFAULT_HAZARD_TOLERANCE_MINUTES),
            asset_window: TimeDelta::minutes(DEFAULT_ASSET_WINDOW_MINUTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.hazard_tolerance(), TimeDelta::hours(2));
        assert_eq!(config.asset_window(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = SyncConfig::from_minutes(-1, 30).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(SyncConfig::from_minutes(120, -5).is_err());
    }

    #[test]
    fn test_zero_tolerance_allowed() {
        let config = SyncConfig::from_minutes(0, 0).unwrap();
        assert_eq!(config.asset_window(), TimeDelta::zero());
    }
}
