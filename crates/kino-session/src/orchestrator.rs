//! Strategy orchestrator
//!
//! Owns the strategy instance and the escalation state machine:
//! - WAITING arms the buffering timer (longer before the first PLAYING)
//! - strategy errors arm the fatal-error timer
//! - either expiry asks the source directory to fail over
//! - live seeks on restartable platforms reload instead of seeking
//!
//! Reloads (failover, live restart) go through one queue and run one at a
//! time, each resuming when its source-directory operation reports back.

use crate::{
    aggregator::{Aggregator, MediaUpdate},
    config::SessionOptions,
    controller::Input,
    plugins::{PluginEvent, Plugins},
    sources::SourceDirectory,
    state::SessionState,
    strategy::{Strategy, StrategyEvent, StrategyEventSink, StrategyFactory},
    timers::{SessionTimers, TimerKind},
    types::{
        FailoverRequest, LiveSupport, MediaState, PauseOptions, PlaybackState, SeekableRange,
        SessionId, StrategyError, StrategyPauseOptions, TimeWindow, WindowType,
    },
    Error, Result,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Operation that ends with the strategy being torn down and reloaded
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Reload {
    Failover { is_buffering_timeout_error: bool },
    LiveRestart { time: f64 },
}

/// What was captured before the source-directory call
#[derive(Debug, Clone, Copy)]
enum ReloadContext {
    Failover {
        is_buffering_timeout_error: bool,
        current_time: f64,
        old_window_start: f64,
    },
    LiveRestart {
        time: f64,
        old_window_start: f64,
    },
}

struct InFlight {
    ticket: u64,
    context: ReloadContext,
    handle: JoinHandle<()>,
}

/// Result of a source-directory call, posted back to the session inbox
#[derive(Debug)]
pub(crate) struct ReloadOutcome {
    ticket: u64,
    result: Result<()>,
}

pub(crate) struct Orchestrator {
    session_id: SessionId,
    options: SessionOptions,
    factory: Arc<dyn StrategyFactory>,
    sources: Arc<dyn SourceDirectory>,
    plugins: Plugins,
    inbox: mpsc::UnboundedSender<Input>,
    strategy: Option<Box<dyn Strategy>>,
    /// Generation of the live strategy instance
    generation: u64,
    timers: SessionTimers,
    reloads: VecDeque<Reload>,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl Orchestrator {
    pub(crate) fn new(
        session_id: SessionId,
        options: SessionOptions,
        factory: Arc<dyn StrategyFactory>,
        sources: Arc<dyn SourceDirectory>,
        plugins: Plugins,
        inbox: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            session_id,
            options,
            factory,
            sources,
            plugins,
            timers: SessionTimers::new(inbox.clone()),
            inbox,
            strategy: None,
            generation: 0,
            reloads: VecDeque::new(),
            in_flight: None,
            next_ticket: 0,
        }
    }

    /// Create the first strategy instance and load the media
    pub(crate) fn start(&mut self) {
        info!(
            session_id = %self.session_id,
            strategy = self.factory.name(),
            window_type = ?self.options.window_type,
            is_live = self.options.is_live,
            "Starting session"
        );
        self.load_media(self.options.initial_playback_time, false);
    }

    // ------------------------------------------------------------------
    // Strategy events
    // ------------------------------------------------------------------

    pub(crate) fn on_strategy_event(
        &mut self,
        generation: u64,
        event: StrategyEvent,
        state: &mut SessionState,
        out: &Aggregator,
    ) {
        if generation != self.generation || self.strategy.is_none() {
            debug!(
                generation,
                current = self.generation,
                "Discarding event from released strategy"
            );
            return;
        }
        if state.is_terminated() {
            debug!(?event, "Session terminated, ignoring strategy event");
            return;
        }

        match event {
            StrategyEvent::State(MediaState::Waiting) => self.on_waiting(state, out),
            StrategyEvent::State(MediaState::Playing) => self.on_playing(state, out),
            StrategyEvent::State(MediaState::Paused) => self.on_paused(state, out),
            StrategyEvent::State(MediaState::Ended) => self.on_ended(state, out),
            StrategyEvent::TimeUpdate { current_time } => {
                out.time_update(state, current_time, self.seekable_range());
            }
            StrategyEvent::Error(error) => self.on_error(error, state, out),
        }
    }

    fn on_waiting(&mut self, state: &mut SessionState, out: &Aggregator) {
        self.timers.cancel(TimerKind::Buffering);
        self.publish(PlaybackState::Waiting, state, out);

        let timeout = self.options.config.buffering_timeout(state.is_initial_play);
        self.timers.arm(TimerKind::Buffering, timeout);
        debug!(timeout_ms = timeout.as_millis() as u64, "Buffering timer armed");

        self.clear_error_notification(state);
        self.dispatch(PluginEvent::Buffering);
        state.buffering_raised = true;
    }

    fn on_playing(&mut self, state: &mut SessionState, out: &Aggregator) {
        self.clear_timeouts(state);
        self.publish(PlaybackState::Playing, state, out);
        state.is_initial_play = false;
    }

    fn on_paused(&mut self, state: &mut SessionState, out: &Aggregator) {
        self.clear_timeouts(state);
        self.publish(PlaybackState::Paused, state, out);
    }

    fn on_ended(&mut self, state: &mut SessionState, out: &Aggregator) {
        self.clear_timeouts(state);
        self.publish(PlaybackState::Ended, state, out);
    }

    fn on_error(&mut self, error: StrategyError, state: &mut SessionState, out: &Aggregator) {
        warn!(
            session_id = %self.session_id,
            code = error.code,
            message = %error.message,
            "Strategy error"
        );

        self.timers.cancel(TimerKind::Buffering);
        // Sent on every error, raised or not
        self.dispatch(PluginEvent::BufferingCleared {
            is_initial_play: state.is_initial_play,
        });
        state.buffering_raised = false;
        self.publish(PlaybackState::Waiting, state, out);

        self.dispatch(PluginEvent::Error {
            code: error.code,
            message: error.message,
        });
        state.error_raised = true;

        if !self.timers.is_pending(TimerKind::FatalError) && !state.fatal_error {
            self.timers
                .arm(TimerKind::FatalError, self.options.config.fatal_error_timeout());
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub(crate) fn on_timer(&mut self, kind: TimerKind, token: u64, state: &mut SessionState) {
        if !self.timers.claim(kind, token) {
            debug!(timer = %kind, token, "Ignoring stale timer expiry");
            return;
        }

        match kind {
            TimerKind::Buffering => {
                info!(session_id = %self.session_id, "Buffering timeout");
                self.dispatch(PluginEvent::BufferingCleared {
                    is_initial_play: state.is_initial_play,
                });
                state.buffering_raised = false;
                self.attempt_failover(true, state);
            }
            TimerKind::FatalError => {
                info!(session_id = %self.session_id, "Fatal error timeout");
                state.fatal_error = true;
                self.attempt_failover(false, state);
            }
        }
    }

    /// Cancel both timers after a clean transition
    fn clear_timeouts(&mut self, state: &mut SessionState) {
        self.timers.cancel_all();
        state.fatal_error = false;
        self.clear_buffering_notification(state);
        self.clear_error_notification(state);
    }

    fn clear_buffering_notification(&self, state: &mut SessionState) {
        if state.buffering_raised {
            self.dispatch(PluginEvent::BufferingCleared {
                is_initial_play: state.is_initial_play,
            });
            state.buffering_raised = false;
        }
    }

    fn clear_error_notification(&self, state: &mut SessionState) {
        if state.error_raised {
            self.dispatch(PluginEvent::ErrorCleared);
            state.error_raised = false;
        }
    }

    // ------------------------------------------------------------------
    // Failover and live restart
    // ------------------------------------------------------------------

    fn attempt_failover(&mut self, is_buffering_timeout_error: bool, state: &SessionState) {
        self.enqueue(
            Reload::Failover {
                is_buffering_timeout_error,
            },
            state,
        );
    }

    fn enqueue(&mut self, reload: Reload, state: &SessionState) {
        debug!(?reload, queued = self.reloads.len(), "Reload requested");
        self.reloads.push_back(reload);
        self.pump(state);
    }

    /// Start the next queued reload unless one is already running
    fn pump(&mut self, state: &SessionState) {
        if self.in_flight.is_some() {
            return;
        }
        if state.is_terminated() {
            self.reloads.clear();
            return;
        }
        if let Some(reload) = self.reloads.pop_front() {
            self.start_reload(reload);
        }
    }

    fn start_reload(&mut self, reload: Reload) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let inbox = self.inbox.clone();
        let sources = Arc::clone(&self.sources);
        let old_window_start = self.sources.time().window_start_time;

        let (context, handle) = match reload {
            Reload::Failover {
                is_buffering_timeout_error,
            } => {
                let current_time = self.current_time();
                let request = FailoverRequest {
                    is_buffering_timeout_error,
                    current_time,
                    duration: self.duration(),
                    reason: if is_buffering_timeout_error {
                        "buffering timeout".to_string()
                    } else {
                        "strategy error".to_string()
                    },
                };
                info!(
                    session_id = %self.session_id,
                    is_buffering_timeout_error,
                    current_time,
                    "Attempting failover"
                );
                let handle = tokio::spawn(async move {
                    let result = sources.failover(request).await;
                    let _ = inbox.send(Input::Reload(ReloadOutcome { ticket, result }));
                });
                (
                    ReloadContext::Failover {
                        is_buffering_timeout_error,
                        current_time,
                        old_window_start,
                    },
                    handle,
                )
            }
            Reload::LiveRestart { time } => {
                info!(
                    session_id = %self.session_id,
                    time,
                    "Restarting live stream at new position"
                );
                let handle = tokio::spawn(async move {
                    let result = sources.refresh().await;
                    let _ = inbox.send(Input::Reload(ReloadOutcome { ticket, result }));
                });
                (
                    ReloadContext::LiveRestart {
                        time,
                        old_window_start,
                    },
                    handle,
                )
            }
        };

        self.in_flight = Some(InFlight {
            ticket,
            context,
            handle,
        });
    }

    pub(crate) fn on_reload_outcome(
        &mut self,
        outcome: ReloadOutcome,
        state: &mut SessionState,
        out: &Aggregator,
    ) {
        let context = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == outcome.ticket => in_flight.context,
            other => {
                self.in_flight = other;
                debug!(ticket = outcome.ticket, "Ignoring outcome of a cancelled reload");
                return;
            }
        };

        match (context, outcome.result) {
            (
                ReloadContext::Failover {
                    current_time,
                    old_window_start,
                    ..
                },
                Ok(()),
            ) => {
                let failover_time = current_time - self.window_offset(old_window_start) / 1000.0;
                let then_pause = self.is_paused();
                self.release_strategy();
                info!(
                    session_id = %self.session_id,
                    failover_time,
                    then_pause,
                    "Failover succeeded, reloading"
                );
                self.load_media(Some(failover_time), then_pause);
            }
            (
                ReloadContext::Failover {
                    is_buffering_timeout_error,
                    ..
                },
                Err(error),
            ) => {
                warn!(session_id = %self.session_id, %error, "Sources exhausted");
                self.bubble_fatal_error(is_buffering_timeout_error, state, out);
            }
            (
                ReloadContext::LiveRestart {
                    time,
                    old_window_start,
                },
                Ok(()),
            ) => {
                let window_offset = self.sources.time().window_start_time - old_window_start;
                let mut seek_target = Some(time - window_offset / 1000.0);
                let mut then_pause = self.is_paused();
                let seekable = self.seekable_range();
                self.release_strategy();

                let discard_after =
                    seekable.end - self.options.config.live_restart_discard_threshold;
                if seek_target.is_some_and(|target| target > discard_after) {
                    debug!(?seek_target, discard_after, "Seek target near live edge, playing live");
                    seek_target = None;
                    then_pause = false;
                }
                self.load_media(seek_target, then_pause);
            }
            (ReloadContext::LiveRestart { .. }, Err(error)) => {
                warn!(session_id = %self.session_id, %error, "Live refresh failed");
                self.release_strategy();
                self.bubble_fatal_error(false, state, out);
            }
        }

        self.pump(state);
    }

    /// Drift of the window start since `old_window_start`, zero for static windows
    fn window_offset(&self, old_window_start: f64) -> f64 {
        if self.options.window_type.is_static() {
            0.0
        } else {
            self.sources.time().window_start_time - old_window_start
        }
    }

    /// Publish the terminal FATAL_ERROR
    fn bubble_fatal_error(
        &mut self,
        is_buffering_timeout_error: bool,
        state: &mut SessionState,
        out: &Aggregator,
    ) {
        self.timers.cancel_all();
        self.reloads.clear();
        out.publish(
            state,
            MediaUpdate {
                state: PlaybackState::FatalError,
                current_time: self.current_time(),
                is_buffering_timeout_error: Some(is_buffering_timeout_error),
            },
        );
        self.dispatch(PluginEvent::FatalError {
            is_buffering_timeout_error,
        });
    }

    /// Restartable live platforms serve seeks by reloading
    fn restarts_by_reload(&self) -> bool {
        self.options.is_live
            && !self.options.window_type.is_static()
            && self.factory.live_support() == LiveSupport::Restartable
    }

    // ------------------------------------------------------------------
    // Strategy lifecycle
    // ------------------------------------------------------------------

    fn load_media(&mut self, start_time: Option<f64>, then_pause: bool) {
        self.generation += 1;
        let sink = StrategyEventSink::new(self.generation, self.inbox.clone());
        let mut strategy = self.factory.create(sink);

        debug!(generation = self.generation, ?start_time, then_pause, "Loading media");
        strategy.load(self.options.media_kind, start_time);
        self.strategy = Some(strategy);

        if then_pause && !self.try_pause(PauseOptions::default()) {
            debug!("Could not restore pause after reload");
        }
    }

    /// Tear down the current instance; nothing it emits afterwards is processed
    fn release_strategy(&mut self) {
        self.timers.cancel_all();
        if let Some(mut strategy) = self.strategy.take() {
            debug!(generation = self.generation, "Releasing strategy");
            strategy.reset();
            strategy.tear_down();
        }
    }

    pub(crate) fn tear_down(&mut self) {
        self.reloads.clear();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
        self.release_strategy();
        info!(session_id = %self.session_id, "Session torn down");
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn strategy_mut(&mut self) -> Result<&mut Box<dyn Strategy>> {
        self.strategy.as_mut().ok_or(Error::NoStrategy)
    }

    pub(crate) fn play(&mut self) -> Result<()> {
        self.strategy_mut()?.play();
        Ok(())
    }

    /// Pause unless there is no strategy or its transition rules forbid it
    fn try_pause(&mut self, options: PauseOptions) -> bool {
        let disable_auto_resume =
            self.options.window_type == WindowType::Growing || options.disable_auto_resume;
        match self.strategy.as_mut() {
            Some(strategy) if strategy.transitions().can_be_paused() => {
                strategy.pause(StrategyPauseOptions {
                    disable_auto_resume,
                });
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pause(&mut self, options: PauseOptions, state: &SessionState) -> Result<()> {
        self.strategy_mut()?;
        if self.try_pause(options) {
            Ok(())
        } else {
            Err(Error::TransitionRefused {
                action: "pause",
                state: state.playback_state,
            })
        }
    }

    pub(crate) fn ensure_can_seek(&self, state: &SessionState) -> Result<()> {
        let strategy = self.strategy.as_ref().ok_or(Error::NoStrategy)?;
        if strategy.transitions().can_begin_seek() {
            Ok(())
        } else {
            Err(Error::TransitionRefused {
                action: "seek",
                state: state.playback_state,
            })
        }
    }

    /// Seek in place, or queue a live restart on restartable platforms
    pub(crate) fn set_current_time(&mut self, time: f64, state: &SessionState) -> Result<()> {
        self.ensure_can_seek(state)?;
        if self.restarts_by_reload() {
            self.enqueue(Reload::LiveRestart { time }, state);
        } else {
            self.strategy_mut()?.set_current_time(time);
        }
        Ok(())
    }

    pub(crate) fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.strategy_mut()?.set_playback_rate(rate);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub(crate) fn current_time(&self) -> f64 {
        self.strategy.as_ref().map_or(0.0, |s| s.current_time())
    }

    pub(crate) fn duration(&self) -> f64 {
        self.strategy.as_ref().map_or(0.0, |s| s.duration())
    }

    pub(crate) fn seekable_range(&self) -> SeekableRange {
        self.strategy
            .as_ref()
            .map_or_else(SeekableRange::default, |s| s.seekable_range())
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.strategy.as_ref().is_some_and(|s| s.is_paused())
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.strategy.as_ref().is_some_and(|s| s.is_ended())
    }

    pub(crate) fn playback_rate(&self) -> f64 {
        self.strategy.as_ref().map_or(1.0, |s| s.playback_rate())
    }

    pub(crate) fn window(&self) -> TimeWindow {
        self.sources.time()
    }

    pub(crate) fn window_type(&self) -> WindowType {
        self.options.window_type
    }

    pub(crate) fn is_timer_pending(&self, kind: TimerKind) -> bool {
        self.timers.is_pending(kind)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    fn publish(&self, playback_state: PlaybackState, state: &mut SessionState, out: &Aggregator) {
        out.publish(
            state,
            MediaUpdate {
                state: playback_state,
                current_time: self.current_time(),
                is_buffering_timeout_error: None,
            },
        );
    }

    fn dispatch(&self, event: PluginEvent) {
        self.plugins.dispatch(self.session_id, &event);
    }
}
