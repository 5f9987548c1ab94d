//! In-memory strategy
//!
//! Behaves like a well-mannered engine: `load` and seeks report WAITING,
//! `play` reports PLAYING, `pause` reports PAUSED. Anything else (stalls,
//! errors, time updates) is scripted through a [`SimulationHandle`].

use super::{Strategy, StrategyEventSink, StrategyFactory, Transitions};
use crate::types::{
    LiveSupport, MediaKind, MediaState, SeekableRange, StrategyError, StrategyPauseOptions,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Command received by a simulated instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum StrategyCall {
    Load {
        media_kind: MediaKind,
        start_time: Option<f64>,
    },
    Reset,
    TearDown,
    Play,
    Pause {
        disable_auto_resume: bool,
    },
    SetCurrentTime {
        time: f64,
    },
    SetPlaybackRate {
        rate: f64,
    },
}

#[derive(Debug)]
struct Engine {
    /// (instance generation, call) in the order received
    calls: Vec<(u64, StrategyCall)>,
    sink: Option<StrategyEventSink>,
    instances_created: usize,
    instances_alive: usize,
    state: Option<MediaState>,
    current_time: f64,
    duration: f64,
    seekable_range: SeekableRange,
    playback_rate: f64,
    transitions: Option<Transitions>,
}

impl Engine {
    fn new(duration: f64, seekable_range: SeekableRange) -> Self {
        Self {
            calls: Vec::new(),
            sink: None,
            instances_created: 0,
            instances_alive: 0,
            state: None,
            current_time: 0.0,
            duration,
            seekable_range,
            playback_rate: 1.0,
            transitions: None,
        }
    }
}

/// Factory producing [`SimulatedStrategy`] instances that share one engine
pub struct SimulatedStrategyFactory {
    engine: Arc<Mutex<Engine>>,
    live_support: LiveSupport,
}

impl SimulatedStrategyFactory {
    /// Factory for on-demand media of the given duration
    pub fn new(live_support: LiveSupport, duration: f64) -> (Self, SimulationHandle) {
        Self::with_seekable_range(live_support, duration, SeekableRange::new(0.0, duration))
    }

    pub fn with_seekable_range(
        live_support: LiveSupport,
        duration: f64,
        seekable_range: SeekableRange,
    ) -> (Self, SimulationHandle) {
        let engine = Arc::new(Mutex::new(Engine::new(duration, seekable_range)));
        let handle = SimulationHandle {
            engine: Arc::clone(&engine),
        };
        (
            Self {
                engine,
                live_support,
            },
            handle,
        )
    }
}

impl StrategyFactory for SimulatedStrategyFactory {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn live_support(&self) -> LiveSupport {
        self.live_support
    }

    fn create(&self, sink: StrategyEventSink) -> Box<dyn Strategy> {
        let mut engine = self.engine.lock();
        engine.instances_created += 1;
        engine.instances_alive += 1;
        engine.sink = Some(sink.clone());
        engine.state = None;
        debug!(generation = sink.generation(), "Simulated strategy created");

        Box::new(SimulatedStrategy {
            engine: Arc::clone(&self.engine),
            sink,
            released: false,
        })
    }
}

/// Strategy instance backed by the shared simulated engine
pub struct SimulatedStrategy {
    engine: Arc<Mutex<Engine>>,
    sink: StrategyEventSink,
    released: bool,
}

impl SimulatedStrategy {
    fn record(&self, call: StrategyCall) {
        self.engine.lock().calls.push((self.sink.generation(), call));
    }

    fn report(&self, state: MediaState) {
        self.engine.lock().state = Some(state);
        self.sink.state(state);
    }
}

impl Strategy for SimulatedStrategy {
    fn load(&mut self, media_kind: MediaKind, start_time: Option<f64>) {
        self.record(StrategyCall::Load {
            media_kind,
            start_time,
        });
        {
            let mut engine = self.engine.lock();
            engine.current_time = start_time.unwrap_or(engine.seekable_range.start);
        }
        self.report(MediaState::Waiting);
    }

    fn reset(&mut self) {
        self.record(StrategyCall::Reset);
        self.engine.lock().state = None;
    }

    fn tear_down(&mut self) {
        self.record(StrategyCall::TearDown);
        if !self.released {
            self.released = true;
            let mut engine = self.engine.lock();
            engine.instances_alive = engine.instances_alive.saturating_sub(1);
        }
    }

    fn play(&mut self) {
        self.record(StrategyCall::Play);
        self.report(MediaState::Playing);
    }

    fn pause(&mut self, options: StrategyPauseOptions) {
        self.record(StrategyCall::Pause {
            disable_auto_resume: options.disable_auto_resume,
        });
        self.report(MediaState::Paused);
    }

    fn set_current_time(&mut self, time: f64) {
        self.record(StrategyCall::SetCurrentTime { time });
        self.engine.lock().current_time = time;
        self.report(MediaState::Waiting);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.record(StrategyCall::SetPlaybackRate { rate });
        self.engine.lock().playback_rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.engine.lock().playback_rate
    }

    fn current_time(&self) -> f64 {
        self.engine.lock().current_time
    }

    fn duration(&self) -> f64 {
        self.engine.lock().duration
    }

    fn seekable_range(&self) -> SeekableRange {
        self.engine.lock().seekable_range
    }

    fn is_paused(&self) -> bool {
        self.engine.lock().state == Some(MediaState::Paused)
    }

    fn is_ended(&self) -> bool {
        self.engine.lock().state == Some(MediaState::Ended)
    }

    fn transitions(&self) -> Transitions {
        let engine = self.engine.lock();
        engine
            .transitions
            .unwrap_or_else(|| Transitions::for_state(engine.state))
    }
}

/// Scripting and inspection handle for the simulated engine
#[derive(Clone)]
pub struct SimulationHandle {
    engine: Arc<Mutex<Engine>>,
}

impl SimulationHandle {
    /// Report a state from the current instance
    pub fn emit_state(&self, state: MediaState) {
        let sink = {
            let mut engine = self.engine.lock();
            engine.state = Some(state);
            engine.sink.clone()
        };
        if let Some(sink) = sink {
            sink.state(state);
        }
    }

    /// Move the playhead and report it
    pub fn emit_time_update(&self, current_time: f64) {
        let sink = {
            let mut engine = self.engine.lock();
            engine.current_time = current_time;
            engine.sink.clone()
        };
        if let Some(sink) = sink {
            sink.time_update(current_time);
        }
    }

    /// Report an engine error
    pub fn emit_error(&self, error: StrategyError) {
        let sink = self.engine.lock().sink.clone();
        if let Some(sink) = sink {
            sink.error(error);
        }
    }

    pub fn set_seekable_range(&self, range: SeekableRange) {
        self.engine.lock().seekable_range = range;
    }

    pub fn set_duration(&self, duration: f64) {
        self.engine.lock().duration = duration;
    }

    /// Override the transition rules; `None` restores the state-derived rules
    pub fn set_transitions(&self, transitions: Option<Transitions>) {
        self.engine.lock().transitions = transitions;
    }

    /// Every call received, tagged with the instance generation
    pub fn calls(&self) -> Vec<(u64, StrategyCall)> {
        self.engine.lock().calls.clone()
    }

    /// Calls received by the instance with the given generation
    pub fn calls_for(&self, generation: u64) -> Vec<StrategyCall> {
        self.engine
            .lock()
            .calls
            .iter()
            .filter(|(g, _)| *g == generation)
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Generation of the newest instance
    pub fn current_generation(&self) -> Option<u64> {
        self.engine.lock().sink.as_ref().map(|s| s.generation())
    }

    pub fn instances_created(&self) -> usize {
        self.engine.lock().instances_created
    }

    pub fn instances_alive(&self) -> usize {
        self.engine.lock().instances_alive
    }

    pub fn current_time(&self) -> f64 {
        self.engine.lock().current_time
    }
}
