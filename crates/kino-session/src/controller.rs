//! Session controller - public handle of one playback session
//!
//! Each session runs as a single tokio task that owns the session state and
//! processes one inbox strictly in arrival order:
//! - strategy events
//! - timer expiries
//! - source-directory outcomes
//! - public commands and queries
//!
//! [`SessionController`] is the handle used to talk to that task.

use crate::{
    aggregator::Aggregator,
    config::SessionOptions,
    listeners::{ListenerId, ReadyGate, SharedRegistry},
    orchestrator::{Orchestrator, ReloadOutcome},
    plugins::Plugins,
    sources::SourceDirectory,
    state::SessionState,
    strategy::{StrategyEvent, StrategyFactory},
    timers::TimerKind,
    types::{
        PauseOptions, PlaybackState, SeekableRange, SessionId, StateChange, TimeUpdate, TimeWindow,
    },
    Error, Result,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

/// Everything the session task reacts to
pub(crate) enum Input {
    Strategy {
        generation: u64,
        event: StrategyEvent,
    },
    Timer {
        kind: TimerKind,
        token: u64,
    },
    Reload(ReloadOutcome),
    Command {
        command: Command,
        reply: oneshot::Sender<Result<()>>,
    },
    Query(Box<dyn FnOnce(&SessionCore) + Send>),
    TearDown {
        reply: Option<oneshot::Sender<()>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Command {
    Play,
    Pause(PauseOptions),
    Seek(f64),
    SetPlaybackRate(f64),
}

/// State owned by the session task
pub(crate) struct SessionCore {
    pub(crate) state: SessionState,
    pub(crate) orchestrator: Orchestrator,
    pub(crate) aggregator: Aggregator,
}

impl SessionCore {
    fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::Strategy { generation, event } => {
                self.orchestrator
                    .on_strategy_event(generation, event, &mut self.state, &self.aggregator);
            }
            Input::Timer { kind, token } => {
                self.orchestrator.on_timer(kind, token, &mut self.state);
            }
            Input::Reload(outcome) => {
                self.orchestrator
                    .on_reload_outcome(outcome, &mut self.state, &self.aggregator);
            }
            Input::Command { command, reply } => {
                let result = self.execute(command);
                let _ = reply.send(result);
            }
            Input::Query(query) => query(&*self),
            Input::TearDown { reply } => {
                self.orchestrator.tear_down();
                self.aggregator.tear_down();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        if self.state.is_terminated() {
            return Err(Error::SessionTerminated);
        }
        debug!(?command, state = %self.state.playback_state, "Executing command");

        match command {
            Command::Play => self.orchestrator.play(),
            Command::Pause(options) => {
                self.aggregator.prepare_pause(&mut self.state, &options);
                let result = self.orchestrator.pause(options, &self.state);
                if result.is_err() {
                    self.state.pause_trigger = None;
                }
                result
            }
            Command::Seek(time) => {
                self.orchestrator.ensure_can_seek(&self.state)?;
                let seekable = self.orchestrator.seekable_range();
                self.aggregator.prepare_seek(&mut self.state, time, seekable);
                self.orchestrator.set_current_time(time, &self.state)
            }
            Command::SetPlaybackRate(rate) => self.orchestrator.set_playback_rate(rate),
        }
    }
}

async fn run(mut core: SessionCore, mut inbox: mpsc::UnboundedReceiver<Input>) {
    core.orchestrator.start();
    while let Some(input) = inbox.recv().await {
        if core.handle(input).is_break() {
            break;
        }
    }
    debug!("Session task stopped");
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub buffering_timer_pending: bool,
    pub fatal_timer_pending: bool,
}

/// Handle to a running playback session
///
/// Dropping the handle tears the session down.
pub struct SessionController {
    id: SessionId,
    inbox: mpsc::UnboundedSender<Input>,
    state_listeners: SharedRegistry<StateChange>,
    time_listeners: SharedRegistry<TimeUpdate>,
    ready: ReadyGate,
    plugins: Plugins,
}

impl SessionController {
    /// Start a session and load the media.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        options: SessionOptions,
        factory: Arc<dyn StrategyFactory>,
        sources: Arc<dyn SourceDirectory>,
        plugins: Plugins,
    ) -> Result<Self> {
        options.config.validate()?;

        let id = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let state_listeners = SharedRegistry::new();
        let time_listeners = SharedRegistry::new();
        let ready = ReadyGate::new();

        let aggregator = Aggregator::new(
            id,
            options.window_type,
            options.initial_playback_time,
            options.config.end_of_stream_tolerance,
            state_listeners.clone(),
            time_listeners.clone(),
            ready.clone(),
        );
        let orchestrator =
            Orchestrator::new(id, options, factory, sources, plugins.clone(), tx.clone());

        let core = SessionCore {
            state: SessionState::new(),
            orchestrator,
            aggregator,
        };
        tokio::spawn(run(core, rx));

        info!(session_id = %id, "Session spawned");

        Ok(Self {
            id,
            inbox: tx,
            state_listeners,
            time_listeners,
            ready,
            plugins,
        })
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Plugin registry this session reports to
    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    fn send(&self, input: Input) -> Result<()> {
        self.inbox.send(input).map_err(|_| Error::ControllerClosed)
    }

    async fn command(&self, command: Command) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Command { command, reply })?;
        rx.await.map_err(|_| Error::ControllerClosed)?
    }

    async fn query<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SessionCore) -> T + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Query(Box::new(move |core: &SessionCore| {
            let _ = reply.send(f(core));
        })))?;
        rx.await.map_err(|_| Error::ControllerClosed)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Start or resume playback
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn play(&self) -> Result<()> {
        self.command(Command::Play).await
    }

    /// Pause playback; refused when the strategy cannot pause right now
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn pause(&self, options: PauseOptions) -> Result<()> {
        self.command(Command::Pause(options)).await
    }

    /// Seek to `time` (media seconds)
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn set_current_time(&self, time: f64) -> Result<()> {
        self.command(Command::Seek(time)).await
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.command(Command::SetPlaybackRate(rate)).await
    }

    /// Stop the session: cancels timers, drops in-flight source operations
    /// and releases the strategy. Later calls fail with `ControllerClosed`.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn tear_down(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::TearDown { reply: Some(reply) })?;
        rx.await.map_err(|_| Error::ControllerClosed)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn current_time(&self) -> Result<f64> {
        self.query(|core| core.orchestrator.current_time()).await
    }

    pub async fn duration(&self) -> Result<f64> {
        self.query(|core| core.orchestrator.duration()).await
    }

    pub async fn seekable_range(&self) -> Result<SeekableRange> {
        self.query(|core| core.orchestrator.seekable_range()).await
    }

    pub async fn is_paused(&self) -> Result<bool> {
        self.query(|core| core.orchestrator.is_paused()).await
    }

    pub async fn is_ended(&self) -> Result<bool> {
        self.query(|core| core.orchestrator.is_ended()).await
    }

    pub async fn playback_rate(&self) -> Result<f64> {
        self.query(|core| core.orchestrator.playback_rate()).await
    }

    /// Window bounds from the source directory (epoch milliseconds)
    pub async fn window(&self) -> Result<TimeWindow> {
        self.query(|core| core.orchestrator.window()).await
    }

    /// Last published state
    pub async fn state(&self) -> Result<PlaybackState> {
        self.query(|core| core.state.playback_state).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.query(|core| SessionSnapshot {
            state: core.state.clone(),
            buffering_timer_pending: core.orchestrator.is_timer_pending(TimerKind::Buffering),
            fatal_timer_pending: core.orchestrator.is_timer_pending(TimerKind::FatalError),
        })
        .await
    }

    /// Epoch milliseconds of a media time; `None` for static windows
    pub async fn video_time_to_epoch_ms(&self, time: f64) -> Result<Option<f64>> {
        self.query(move |core| {
            let orchestrator = &core.orchestrator;
            (!orchestrator.window_type().is_static())
                .then(|| orchestrator.window().window_start_time + time * 1000.0)
        })
        .await
    }

    /// Media time of an epoch timestamp; `None` for static windows
    pub async fn epoch_ms_to_video_time(&self, epoch_ms: f64) -> Result<Option<f64>> {
        self.query(move |core| {
            let orchestrator = &core.orchestrator;
            (!orchestrator.window_type().is_static())
                .then(|| (epoch_ms - orchestrator.window().window_start_time) / 1000.0)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn on_state_change(
        &self,
        listener: impl Fn(&StateChange) + Send + Sync + 'static,
    ) -> ListenerId {
        self.state_listeners.add(Arc::new(listener))
    }

    pub fn off_state_change(&self, id: ListenerId) -> bool {
        self.state_listeners.remove(id)
    }

    pub fn on_time_update(
        &self,
        listener: impl Fn(&TimeUpdate) + Send + Sync + 'static,
    ) -> ListenerId {
        self.time_listeners.add(Arc::new(listener))
    }

    pub fn off_time_update(&self, id: ListenerId) -> bool {
        self.time_listeners.remove(id)
    }

    /// Run `callback` once the session first reports a valid time.
    /// Never runs if the session hits a fatal error first.
    pub fn on_ready(&self, callback: impl FnOnce() + Send + 'static) {
        self.ready.on_ready(callback);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let _ = self.inbox.send(Input::TearDown { reply: None });
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .finish()
    }
}
