//! Error types for Kino Session

use crate::types::PlaybackState;
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session error types
#[derive(Error, Debug)]
pub enum Error {
    // Command errors
    #[error("Cannot {action} while {state}")]
    TransitionRefused {
        action: &'static str,
        state: PlaybackState,
    },

    #[error("Session terminated after a fatal error")]
    SessionTerminated,

    #[error("Session controller is closed")]
    ControllerClosed,

    #[error("No strategy loaded")]
    NoStrategy,

    // Source directory errors
    #[error("No more sources available")]
    SourcesExhausted,

    #[error("Source refresh failed: {0}")]
    RefreshFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if retrying the operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TransitionRefused { .. } | Error::NoStrategy | Error::RefreshFailed(_)
        )
    }

    /// Returns the error code for telemetry
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::TransitionRefused { .. } => "TRANSITION_REFUSED",
            Error::SessionTerminated => "SESSION_TERMINATED",
            Error::ControllerClosed => "CONTROLLER_CLOSED",
            Error::NoStrategy => "NO_STRATEGY",
            Error::SourcesExhausted => "SOURCES_EXHAUSTED",
            Error::RefreshFailed(_) => "REFRESH_FAILED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}
