//! Session configuration
//!
//! Escalation timeouts and live-window tolerances, loadable from JSON.

use crate::{
    types::{MediaKind, WindowType},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timeouts and tolerances driving escalation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Buffering allowed before the first PLAYING (ms)
    pub initial_buffering_timeout_ms: u64,
    /// Buffering allowed once playback has started (ms)
    pub buffering_timeout_ms: u64,
    /// Time a strategy error may persist before failover (ms)
    pub fatal_error_timeout_ms: u64,
    /// Distance from the live edge counted as end of stream (seconds)
    pub end_of_stream_tolerance: f64,
    /// Live restart targets this close to the seekable end play live instead (seconds)
    pub live_restart_discard_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_buffering_timeout_ms: 30_000,
            buffering_timeout_ms: 20_000,
            fatal_error_timeout_ms: 5_000,
            end_of_stream_tolerance: 10.0,
            live_restart_discard_threshold: 30.0,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the state machine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.initial_buffering_timeout_ms == 0 || self.buffering_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "buffering timeouts must be non-zero".to_string(),
            ));
        }
        if self.fatal_error_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "fatal error timeout must be non-zero".to_string(),
            ));
        }
        if self.end_of_stream_tolerance.is_nan() || self.end_of_stream_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "end_of_stream_tolerance must be >= 0, got {}",
                self.end_of_stream_tolerance
            )));
        }
        if self.live_restart_discard_threshold.is_nan()
            || self.live_restart_discard_threshold < 0.0
        {
            return Err(Error::InvalidConfig(format!(
                "live_restart_discard_threshold must be >= 0, got {}",
                self.live_restart_discard_threshold
            )));
        }
        Ok(())
    }

    /// Buffering timeout for the current phase of the session
    pub fn buffering_timeout(&self, is_initial_play: bool) -> Duration {
        if is_initial_play {
            Duration::from_millis(self.initial_buffering_timeout_ms)
        } else {
            Duration::from_millis(self.buffering_timeout_ms)
        }
    }

    pub fn fatal_error_timeout(&self) -> Duration {
        Duration::from_millis(self.fatal_error_timeout_ms)
    }
}

/// Everything describing one playback attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub media_kind: MediaKind,
    pub window_type: WindowType,
    /// Live content (window bounds come from the source directory)
    pub is_live: bool,
    /// Requested start position; `None` starts at the default point
    pub initial_playback_time: Option<f64>,
    pub config: SessionConfig,
}

impl SessionOptions {
    /// On-demand content starting at the beginning
    pub fn vod() -> Self {
        Self::default()
    }

    /// Live content on the given window type
    pub fn live(window_type: WindowType) -> Self {
        Self {
            window_type,
            is_live: true,
            ..Default::default()
        }
    }

    pub fn with_initial_playback_time(mut self, time: f64) -> Self {
        self.initial_playback_time = Some(time);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}
