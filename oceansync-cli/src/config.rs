use std::path::Path;

use anyhow::{Context, Result};
use oceansync_core::config::{DEFAULT_ASSET_WINDOW_MINUTES, DEFAULT_HAZARD_TOLERANCE_MINUTES};
use oceansync_core::SyncConfig;
use oceansync_player::FrameInterval;
use serde::Deserialize;

/// Playback and matching settings read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Milliseconds between two advances.
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,

    /// Restart from the first frame after the last one.
    #[serde(default)]
    pub loop_playback: bool,

    /// Maximum distance from a snapshot for a typhoon fix, in minutes.
    #[serde(default = "default_hazard_tolerance")]
    pub hazard_tolerance_minutes: i64,

    /// Half-width of the glider window around a snapshot, in minutes.
    #[serde(default = "default_asset_window")]
    pub asset_window_minutes: i64,
}

fn default_interval_ms() -> u64 {
    FrameInterval::DEFAULT_MILLIS
}
fn default_hazard_tolerance() -> i64 {
    DEFAULT_HAZARD_TOLERANCE_MINUTES
}
fn default_asset_window() -> i64 {
    DEFAULT_ASSET_WINDOW_MINUTES
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            loop_playback: false,
            hazard_tolerance_minutes: default_hazard_tolerance(),
            asset_window_minutes: default_asset_window(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_tolerances(mut self, hazard_minutes: Option<i64>, asset_minutes: Option<i64>) -> Self {
        if let Some(minutes) = hazard_minutes {
            self.hazard_tolerance_minutes = minutes;
        }
        if let Some(minutes) = asset_minutes {
            self.asset_window_minutes = minutes;
        }
        self
    }

    pub fn sync_config(&self) -> Result<SyncConfig> {
        SyncConfig::from_minutes(self.hazard_tolerance_minutes, self.asset_window_minutes)
            .context("Invalid matching tolerances")
    }

    /// Frame interval, preferring `override_ms` over the configured default.
    pub fn frame_interval(&self, override_ms: Option<u64>) -> Result<FrameInterval> {
        FrameInterval::from_millis(override_ms.unwrap_or(self.default_interval_ms))
            .context("Invalid frame interval")
    }
}
