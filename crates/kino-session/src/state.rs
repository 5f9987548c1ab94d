//! Mutable session state shared by the orchestrator and the aggregator

use crate::types::{PauseTrigger, PlaybackState};
use serde::{Deserialize, Serialize};

/// Session state, owned by the session actor for its whole lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Last state published to listeners
    pub playback_state: PlaybackState,
    /// True until the first PLAYING, never reset afterwards
    pub is_initial_play: bool,
    /// Trigger to attach to the next PAUSED publication
    pub pause_trigger: Option<PauseTrigger>,
    /// A seek was issued and its WAITING has not been published yet
    pub is_seeking: bool,
    /// Position is within tolerance of the live edge
    pub end_of_stream: bool,
    /// A fatal-error escalation fired and has not been cleared
    pub fatal_error: bool,
    /// Plugins were told buffering started and not yet that it cleared
    pub buffering_raised: bool,
    /// Plugins were told about an error and not yet that it cleared
    pub error_raised: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            playback_state: PlaybackState::Stopped,
            is_initial_play: true,
            pause_trigger: None,
            is_seeking: false,
            end_of_stream: false,
            fatal_error: false,
            buffering_raised: false,
            error_raised: false,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal sessions accept no commands and ignore strategy events
    pub fn is_terminated(&self) -> bool {
        self.playback_state.is_terminal()
    }
}
