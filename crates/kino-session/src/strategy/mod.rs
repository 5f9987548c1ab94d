//! Strategy adapter interface
//!
//! A strategy wraps one concrete playback engine. The session only talks to
//! it through [`Strategy`]; engine variants are chosen when the session is
//! built, through a [`StrategyFactory`].

mod simulated;

pub use simulated::{SimulatedStrategy, SimulatedStrategyFactory, SimulationHandle, StrategyCall};

use crate::{
    controller::Input,
    types::{LiveSupport, MediaKind, MediaState, SeekableRange, StrategyError, StrategyPauseOptions},
};
use tokio::sync::mpsc;
use tracing::trace;

/// Commands the strategy accepts in its current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transitions {
    can_be_paused: bool,
    can_begin_seek: bool,
}

impl Transitions {
    pub fn new(can_be_paused: bool, can_begin_seek: bool) -> Self {
        Self {
            can_be_paused,
            can_begin_seek,
        }
    }

    /// Everything allowed
    pub fn permissive() -> Self {
        Self::new(true, true)
    }

    /// Typical rules for an engine in the given state; `None` means nothing loaded
    pub fn for_state(state: Option<MediaState>) -> Self {
        match state {
            None => Self::new(false, false),
            Some(MediaState::Ended) => Self::new(false, true),
            Some(MediaState::Playing | MediaState::Paused | MediaState::Waiting) => {
                Self::permissive()
            }
        }
    }

    pub fn can_be_paused(&self) -> bool {
        self.can_be_paused
    }

    pub fn can_begin_seek(&self) -> bool {
        self.can_begin_seek
    }
}

impl Default for Transitions {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Raw notification from a strategy
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyEvent {
    State(MediaState),
    TimeUpdate { current_time: f64 },
    Error(StrategyError),
}

/// Registration hooks handed to a strategy when it is created
///
/// Events are tagged with the instance generation; once the instance has been
/// released, whatever it still emits is discarded by the session.
#[derive(Clone)]
pub struct StrategyEventSink {
    generation: u64,
    inbox: mpsc::UnboundedSender<Input>,
}

impl StrategyEventSink {
    pub(crate) fn new(generation: u64, inbox: mpsc::UnboundedSender<Input>) -> Self {
        Self { generation, inbox }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Event callback: state changed
    pub fn state(&self, state: MediaState) {
        self.send(StrategyEvent::State(state));
    }

    /// Time-update callback
    pub fn time_update(&self, current_time: f64) {
        self.send(StrategyEvent::TimeUpdate { current_time });
    }

    /// Error callback
    pub fn error(&self, error: StrategyError) {
        self.send(StrategyEvent::Error(error));
    }

    fn send(&self, event: StrategyEvent) {
        let input = Input::Strategy {
            generation: self.generation,
            event,
        };
        if self.inbox.send(input).is_err() {
            trace!(generation = self.generation, "Session closed, dropping strategy event");
        }
    }
}

impl std::fmt::Debug for StrategyEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Capability interface of a playback engine
pub trait Strategy: Send {
    /// Load media, starting at `start_time` or the engine default
    fn load(&mut self, media_kind: MediaKind, start_time: Option<f64>);

    /// Stop and unload the current media
    fn reset(&mut self);

    /// Release every resource held by the engine
    fn tear_down(&mut self);

    fn play(&mut self);

    fn pause(&mut self, options: StrategyPauseOptions);

    fn set_current_time(&mut self, time: f64);

    fn set_playback_rate(&mut self, rate: f64);

    fn playback_rate(&self) -> f64;

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn seekable_range(&self) -> SeekableRange;

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    fn transitions(&self) -> Transitions;
}

/// Builds strategy instances for one platform
pub trait StrategyFactory: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Live capability tier of the platform
    fn live_support(&self) -> LiveSupport;

    /// Create a fresh instance wired to `sink`
    fn create(&self, sink: StrategyEventSink) -> Box<dyn Strategy>;
}
