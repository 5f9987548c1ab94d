//! Session aggregator
//!
//! The outward-facing half of a session. Turns orchestrator output into the
//! public event contract:
//! - pause trigger attribution
//! - the seeking flag carried by the next WAITING
//! - end-of-stream detection against the live edge
//! - the one-shot ready gate

use crate::{
    listeners::{ReadyGate, SharedRegistry},
    state::SessionState,
    types::{
        PauseOptions, PauseTrigger, PlaybackState, SeekableRange, SessionId, StateChange,
        TimeUpdate, WindowType,
    },
};
use tracing::{debug, info};

/// A state published by the orchestrator, with the strategy's view at that moment
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MediaUpdate {
    pub state: PlaybackState,
    pub current_time: f64,
    pub is_buffering_timeout_error: Option<bool>,
}

pub(crate) struct Aggregator {
    session_id: SessionId,
    window_type: WindowType,
    initial_playback_time: Option<f64>,
    end_of_stream_tolerance: f64,
    state_listeners: SharedRegistry<StateChange>,
    time_listeners: SharedRegistry<TimeUpdate>,
    ready: ReadyGate,
}

impl Aggregator {
    pub(crate) fn new(
        session_id: SessionId,
        window_type: WindowType,
        initial_playback_time: Option<f64>,
        end_of_stream_tolerance: f64,
        state_listeners: SharedRegistry<StateChange>,
        time_listeners: SharedRegistry<TimeUpdate>,
        ready: ReadyGate,
    ) -> Self {
        Self {
            session_id,
            window_type,
            initial_playback_time,
            end_of_stream_tolerance,
            state_listeners,
            time_listeners,
            ready,
        }
    }

    /// Attribute the upcoming PAUSED to whoever asked for it
    pub(crate) fn prepare_pause(&self, state: &mut SessionState, options: &PauseOptions) {
        state.pause_trigger = Some(if options.user_pause {
            PauseTrigger::User
        } else {
            PauseTrigger::App
        });
    }

    /// Must run before the strategy's seek, which may report WAITING right away
    pub(crate) fn prepare_seek(
        &self,
        state: &mut SessionState,
        time: f64,
        seekable: SeekableRange,
    ) {
        state.is_seeking = true;
        state.end_of_stream = self.is_end_of_stream(seekable.end, time);
    }

    /// Within tolerance of the live edge; never for static windows
    pub(crate) fn is_end_of_stream(&self, seekable_end: f64, time: f64) -> bool {
        !self.window_type.is_static() && (seekable_end - time).abs() < self.end_of_stream_tolerance
    }

    /// Record and publish a state
    pub(crate) fn publish(&self, state: &mut SessionState, update: MediaUpdate) -> StateChange {
        state.playback_state = update.state;

        let mut change = StateChange {
            state: update.state,
            trigger: None,
            is_seeking: None,
            is_buffering_timeout_error: None,
            end_of_stream: state.end_of_stream,
            current_time: update.current_time,
        };

        match update.state {
            PlaybackState::Paused => {
                state.end_of_stream = false;
                change.trigger = Some(state.pause_trigger.take().unwrap_or(PauseTrigger::Device));
            }
            PlaybackState::Waiting => {
                change.is_seeking = Some(state.is_seeking);
                state.is_seeking = false;
            }
            PlaybackState::FatalError => {
                change.is_buffering_timeout_error = update.is_buffering_timeout_error;
                self.ready.cancel();
            }
            _ => {}
        }
        change.end_of_stream = state.end_of_stream;

        debug!(
            session_id = %self.session_id,
            state = %change.state,
            trigger = ?change.trigger,
            is_seeking = ?change.is_seeking,
            end_of_stream = change.end_of_stream,
            "State published"
        );
        self.state_listeners.notify(&change);

        if update.state != PlaybackState::FatalError {
            self.check_ready(update.current_time);
        }
        change
    }

    /// Publish a time update from the strategy
    pub(crate) fn time_update(
        &self,
        state: &mut SessionState,
        current_time: f64,
        seekable: SeekableRange,
    ) -> TimeUpdate {
        state.end_of_stream = self.is_end_of_stream(seekable.end, current_time);

        let update = TimeUpdate {
            current_time,
            end_of_stream: state.end_of_stream,
        };
        self.time_listeners.notify(&update);
        self.check_ready(current_time);
        update
    }

    fn is_valid_time(&self, current_time: f64) -> bool {
        if !current_time.is_finite() {
            return false;
        }
        match self.initial_playback_time {
            Some(offset) if offset > 0.0 => current_time >= offset,
            _ => true,
        }
    }

    fn check_ready(&self, current_time: f64) {
        if self.ready.is_pending() && self.is_valid_time(current_time) && self.ready.fire() {
            info!(session_id = %self.session_id, current_time, "Session ready");
        }
    }

    pub(crate) fn tear_down(&self) {
        self.ready.cancel();
        self.state_listeners.clear();
        self.time_listeners.clear();
    }
}
