//! Core types for Kino Session

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public playback state published to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    /// Nothing has been reported yet
    Stopped,
    /// Paused by the user, the app or the device
    Paused,
    /// Media is playing
    Playing,
    /// Buffering, seeking or recovering from an error
    Waiting,
    /// Reached the end of the media
    Ended,
    /// Terminal failure, no more sources to try
    FatalError,
}

impl PlaybackState {
    /// Returns true once the session can no longer recover
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::FatalError)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "STOPPED"),
            PlaybackState::Paused => write!(f, "PAUSED"),
            PlaybackState::Playing => write!(f, "PLAYING"),
            PlaybackState::Waiting => write!(f, "WAITING"),
            PlaybackState::Ended => write!(f, "ENDED"),
            PlaybackState::FatalError => write!(f, "FATAL_ERROR"),
        }
    }
}

/// Raw state a strategy can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaState {
    Playing,
    Paused,
    Waiting,
    Ended,
}

impl From<MediaState> for PlaybackState {
    fn from(state: MediaState) -> Self {
        match state {
            MediaState::Playing => PlaybackState::Playing,
            MediaState::Paused => PlaybackState::Paused,
            MediaState::Waiting => PlaybackState::Waiting,
            MediaState::Ended => PlaybackState::Ended,
        }
    }
}

impl std::fmt::Display for MediaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        PlaybackState::from(*self).fmt(f)
    }
}

/// What initiated a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseTrigger {
    /// The viewer pressed pause
    User,
    /// Application logic paused playback
    App,
    /// The strategy paused on its own
    Device,
}

/// Shape of the content's time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// On-demand or fixed window, no drift
    #[default]
    Static,
    /// Live window whose start advances with wall-clock time
    Sliding,
    /// Live window whose end advances with wall-clock time
    Growing,
}

impl WindowType {
    pub fn is_static(&self) -> bool {
        matches!(self, WindowType::Static)
    }
}

/// Media type handed to the strategy on load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    #[default]
    Video,
}

/// Live playback capability tier of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveSupport {
    None,
    /// Live edge only
    Playable,
    /// Seeking live content requires a teardown and reload
    Restartable,
    /// In-place seeking within the live window
    #[default]
    Seekable,
}

/// Seekable range reported by a strategy, in media seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeekableRange {
    pub start: f64,
    pub end: f64,
}

impl SeekableRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Window bounds published by a source directory, in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub window_start_time: f64,
    pub window_end_time: f64,
}

impl TimeWindow {
    pub fn new(window_start_time: f64, window_end_time: f64) -> Self {
        Self {
            window_start_time,
            window_end_time,
        }
    }
}

/// Request handed to a source directory when the current source has failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverRequest {
    /// The failure came from a buffering stall rather than a strategy error
    pub is_buffering_timeout_error: bool,
    /// Playback position at the time of failure
    pub current_time: f64,
    /// Media duration at the time of failure
    pub duration: f64,
    /// Human-readable cause
    pub reason: String,
}

/// Options for a public pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseOptions {
    /// False when application logic rather than the viewer asked to pause
    pub user_pause: bool,
    /// Keep the strategy from resuming by itself
    pub disable_auto_resume: bool,
}

impl Default for PauseOptions {
    fn default() -> Self {
        Self {
            user_pause: true,
            disable_auto_resume: false,
        }
    }
}

impl PauseOptions {
    /// Pause requested by application logic
    pub fn app() -> Self {
        Self {
            user_pause: false,
            ..Default::default()
        }
    }
}

/// Pause options as seen by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrategyPauseOptions {
    pub disable_auto_resume: bool,
}

/// Error reported by a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyError {
    pub code: u32,
    pub message: String,
}

impl StrategyError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Payload delivered to state-change listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: PlaybackState,
    /// Set on PAUSED only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<PauseTrigger>,
    /// Set on WAITING only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_seeking: Option<bool>,
    /// Set on FATAL_ERROR only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_buffering_timeout_error: Option<bool>,
    pub end_of_stream: bool,
    pub current_time: f64,
}

/// Payload delivered to time-update listeners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeUpdate {
    pub current_time: f64,
    pub end_of_stream: bool,
}
