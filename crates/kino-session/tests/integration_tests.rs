//! Integration tests for Kino Session
//!
//! Sessions run on a paused tokio clock, so timer expiries are reached by
//! sleeping in the test and everything else settles within a millisecond.

use async_trait::async_trait;
use kino_session::{
    CdnList, Error, EventLog, FailoverRequest, LiveSupport, MediaState, PauseOptions,
    PauseTrigger, PlaybackState, PluginEvent, Plugins, SeekableRange, SessionConfig,
    SessionController, SessionOptions, SimulatedStrategyFactory, SimulationHandle,
    SourceDirectory, StateChange, Strategy, StrategyCall, StrategyError, StrategyEventSink,
    StrategyFactory, TimeUpdate, TimeWindow, Transitions, WindowType,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// =============================================================================
// Helpers
// =============================================================================

const LIVE_WINDOW_START: f64 = 1_600_000_000_000.0;

fn live_window() -> TimeWindow {
    TimeWindow::new(LIVE_WINDOW_START, LIVE_WINDOW_START + 3_600_000.0)
}

/// Let the session task drain its inbox
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn wait_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

struct Harness {
    controller: SessionController,
    sim: SimulationHandle,
    cdns: Arc<CdnList>,
    log: Arc<EventLog>,
    changes: Arc<Mutex<Vec<StateChange>>>,
}

impl Harness {
    fn vod() -> Self {
        let (factory, sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
        Self::start(
            SessionOptions::vod(),
            Arc::new(factory),
            sim,
            CdnList::new(["cdn-a", "cdn-b", "cdn-c"], TimeWindow::default()),
        )
    }

    fn live(window_type: WindowType, live_support: LiveSupport) -> Self {
        let (factory, sim) = SimulatedStrategyFactory::with_seekable_range(
            live_support,
            3_600.0,
            SeekableRange::new(0.0, 3_600.0),
        );
        Self::start(
            SessionOptions::live(window_type),
            Arc::new(factory),
            sim,
            CdnList::new(["cdn-a", "cdn-b"], live_window()),
        )
    }

    fn start(
        options: SessionOptions,
        factory: Arc<dyn StrategyFactory>,
        sim: SimulationHandle,
        cdns: CdnList,
    ) -> Self {
        let cdns = Arc::new(cdns);
        let log = Arc::new(EventLog::new());
        let plugins = Plugins::new();
        plugins.register(log.clone());

        let controller =
            SessionController::spawn(options, factory, cdns.clone(), plugins).unwrap();

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        controller.on_state_change(move |change| sink.lock().push(change.clone()));

        Self {
            controller,
            sim,
            cdns,
            log,
            changes,
        }
    }

    fn states(&self) -> Vec<PlaybackState> {
        self.changes.lock().iter().map(|c| c.state).collect()
    }

    fn last_change(&self) -> StateChange {
        self.changes.lock().last().cloned().expect("no state published")
    }

    fn pause_triggers(&self) -> Vec<PauseTrigger> {
        self.changes.lock().iter().filter_map(|c| c.trigger).collect()
    }
}

/// Source directory whose operations block until released
#[derive(Default)]
struct GatedSources {
    gate: Notify,
    failovers: AtomicUsize,
    refreshes: AtomicUsize,
}

#[async_trait]
impl SourceDirectory for GatedSources {
    fn time(&self) -> TimeWindow {
        live_window()
    }

    async fn failover(&self, _request: FailoverRequest) -> kino_session::Result<()> {
        self.failovers.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }

    async fn refresh(&self) -> kino_session::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(())
    }
}

/// Wraps the simulated factory and keeps every sink it hands out
struct SinkCapture {
    inner: SimulatedStrategyFactory,
    sinks: Mutex<Vec<StrategyEventSink>>,
}

impl StrategyFactory for SinkCapture {
    fn name(&self) -> &'static str {
        "sink-capture"
    }

    fn live_support(&self) -> LiveSupport {
        self.inner.live_support()
    }

    fn create(&self, sink: StrategyEventSink) -> Box<dyn Strategy> {
        self.sinks.lock().push(sink.clone());
        self.inner.create(sink)
    }
}

// =============================================================================
// Buffering Timeout Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_buffering_timeout_is_30s() {
    let h = Harness::vod();
    settle().await;
    assert_eq!(h.states(), vec![PlaybackState::Waiting]);

    wait_secs(29).await;
    assert!(h.cdns.failover_requests().is_empty());

    wait_secs(2).await;
    let requests = h.cdns.failover_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].is_buffering_timeout_error);
    assert_eq!(requests[0].duration, 600.0);
    assert_eq!(h.cdns.current().as_deref(), Some("cdn-b"));
}

#[tokio::test(start_paused = true)]
async fn test_buffering_timeout_is_20s_after_playing() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_state(MediaState::Waiting);
    settle().await;

    let snapshot = h.controller.snapshot().await.unwrap();
    assert!(!snapshot.state.is_initial_play);
    assert!(snapshot.buffering_timer_pending);

    wait_secs(19).await;
    assert!(h.cdns.failover_requests().is_empty());

    wait_secs(2).await;
    assert_eq!(h.cdns.failover_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_one_failover_per_expiry() {
    let h = Harness::vod();
    settle().await;

    // repeated WAITING re-arms rather than stacking timers
    h.sim.emit_state(MediaState::Waiting);
    h.sim.emit_state(MediaState::Waiting);
    settle().await;

    wait_secs(31).await;
    assert_eq!(h.cdns.failover_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_playing_and_paused_cancel_timers() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_error(StrategyError::new(2, "network"));
    settle().await;

    let snapshot = h.controller.snapshot().await.unwrap();
    assert!(snapshot.fatal_timer_pending);

    h.controller.pause(PauseOptions::default()).await.unwrap();
    settle().await;

    let snapshot = h.controller.snapshot().await.unwrap();
    assert!(!snapshot.buffering_timer_pending);
    assert!(!snapshot.fatal_timer_pending);

    wait_secs(60).await;
    assert!(h.cdns.failover_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_buffering_plugin_notifications() {
    let h = Harness::vod();
    settle().await;
    wait_secs(31).await;

    let events = h.log.events();
    assert_eq!(
        &events[..3],
        &[
            PluginEvent::Buffering,
            PluginEvent::BufferingCleared {
                is_initial_play: true
            },
            PluginEvent::Buffering,
        ]
    );
}

// =============================================================================
// Failover Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_failover_tears_down_before_reloading() {
    let h = Harness::vod();
    settle().await;
    wait_secs(31).await;

    let calls = h.sim.calls();
    let teardown = calls
        .iter()
        .position(|c| *c == (1, StrategyCall::TearDown))
        .expect("first instance torn down");
    let reload = calls
        .iter()
        .position(|(generation, call)| {
            *generation == 2 && matches!(call, StrategyCall::Load { .. })
        })
        .expect("second instance loaded");
    assert!(teardown < reload);

    assert_eq!(h.sim.calls_for(1)[1..], [StrategyCall::Reset, StrategyCall::TearDown]);
    assert_eq!(h.sim.instances_created(), 2);
    assert_eq!(h.sim.instances_alive(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failover_adjusts_for_window_drift() {
    let h = Harness::live(WindowType::Sliding, LiveSupport::Seekable);
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_time_update(50.0);
    h.sim.emit_state(MediaState::Waiting);
    settle().await;

    // the new CDN's window starts 10s later
    h.cdns.stage_window(TimeWindow::new(
        LIVE_WINDOW_START + 10_000.0,
        LIVE_WINDOW_START + 3_610_000.0,
    ));
    wait_secs(21).await;

    assert_eq!(h.cdns.failover_requests()[0].current_time, 50.0);
    assert_eq!(
        h.sim.calls_for(2)[0],
        StrategyCall::Load {
            media_kind: Default::default(),
            start_time: Some(40.0),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_error_escalates_after_5s() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_error(StrategyError::new(3, "decode failure"));
    settle().await;
    assert_eq!(h.last_change().state, PlaybackState::Waiting);

    wait_secs(4).await;
    assert!(h.cdns.failover_requests().is_empty());

    wait_secs(2).await;
    let requests = h.cdns.failover_requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].is_buffering_timeout_error);
}

#[tokio::test(start_paused = true)]
async fn test_second_error_does_not_extend_fatal_timer() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_error(StrategyError::new(3, "decode failure"));
    settle().await;

    wait_secs(3).await;
    h.sim.emit_error(StrategyError::new(3, "decode failure"));
    settle().await;

    // fires at t=5 from the first error, not t=8
    wait_secs(2).await;
    settle().await;
    assert_eq!(h.cdns.failover_requests().len(), 1);

    // escalated: further errors cannot re-arm until PLAYING
    h.sim.emit_error(StrategyError::new(4, "again"));
    settle().await;
    let snapshot = h.controller.snapshot().await.unwrap();
    assert!(snapshot.state.fatal_error);
    assert!(!snapshot.fatal_timer_pending);

    wait_secs(10).await;
    assert_eq!(h.cdns.failover_requests().len(), 1);

    h.sim.emit_state(MediaState::Playing);
    settle().await;
    h.sim.emit_error(StrategyError::new(4, "again"));
    settle().await;
    let snapshot = h.controller.snapshot().await.unwrap();
    assert!(!snapshot.state.fatal_error);
    assert!(snapshot.fatal_timer_pending);
}

#[tokio::test(start_paused = true)]
async fn test_error_recovery_clears_notification() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    settle().await;
    h.log.clear();

    // error while PLAYING still clears buffering first
    h.sim.emit_error(StrategyError::new(3, "decode failure"));
    settle().await;
    h.sim.emit_state(MediaState::Playing);
    wait_secs(10).await;

    assert!(h.cdns.failover_requests().is_empty());
    assert_eq!(
        h.log.events(),
        vec![
            PluginEvent::BufferingCleared {
                is_initial_play: false
            },
            PluginEvent::Error {
                code: 3,
                message: "decode failure".to_string()
            },
            PluginEvent::ErrorCleared,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_after_error_is_fatal() {
    let (factory, sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
    let h = Harness::start(
        SessionOptions::vod(),
        Arc::new(factory),
        sim,
        CdnList::new(["only"], TimeWindow::default()),
    );
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_error(StrategyError::new(3, "decode failure"));
    settle().await;

    wait_secs(6).await;

    let fatal = h.last_change();
    assert_eq!(fatal.state, PlaybackState::FatalError);
    assert_eq!(fatal.is_buffering_timeout_error, Some(false));
    assert_eq!(h.cdns.failover_requests().len(), 1);
    assert!(h.log.events().contains(&PluginEvent::FatalError {
        is_buffering_timeout_error: false
    }));

    // terminal: commands refused, strategy events ignored, no further waits
    let err = h.controller.play().await.unwrap_err();
    assert!(matches!(err, Error::SessionTerminated));

    let published = h.changes.lock().len();
    h.sim.emit_state(MediaState::Playing);
    wait_secs(60).await;
    assert_eq!(h.changes.lock().len(), published);
    assert_eq!(h.cdns.failover_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_after_buffering_is_fatal() {
    let (factory, sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
    let h = Harness::start(
        SessionOptions::vod(),
        Arc::new(factory),
        sim,
        CdnList::new(["only"], TimeWindow::default()),
    );
    settle().await;
    wait_secs(31).await;

    let fatal = h.last_change();
    assert_eq!(fatal.state, PlaybackState::FatalError);
    assert_eq!(fatal.is_buffering_timeout_error, Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_stale_strategy_events_ignored() {
    let (inner, _sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
    let factory = Arc::new(SinkCapture {
        inner,
        sinks: Mutex::new(Vec::new()),
    });
    let cdns = Arc::new(CdnList::new(["cdn-a", "cdn-b"], TimeWindow::default()));
    let controller = SessionController::spawn(
        SessionOptions::vod(),
        factory.clone(),
        cdns.clone(),
        Plugins::new(),
    )
    .unwrap();
    settle().await;
    wait_secs(31).await;

    let old = factory.sinks.lock()[0].clone();
    assert_eq!(factory.sinks.lock().len(), 2);

    old.state(MediaState::Playing);
    settle().await;

    assert_eq!(controller.state().await.unwrap(), PlaybackState::Waiting);
    assert!(controller.snapshot().await.unwrap().buffering_timer_pending);
}

// =============================================================================
// Pause Attribution Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_triggers() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();

    h.controller.pause(PauseOptions::app()).await.unwrap();
    h.controller.play().await.unwrap();
    h.controller.pause(PauseOptions::default()).await.unwrap();
    h.controller.play().await.unwrap();
    h.sim.emit_state(MediaState::Paused);
    settle().await;

    assert_eq!(
        h.pause_triggers(),
        vec![PauseTrigger::App, PauseTrigger::User, PauseTrigger::Device]
    );
}

#[tokio::test(start_paused = true)]
async fn test_refused_pause_does_not_leak_trigger() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.set_transitions(Some(Transitions::new(false, true)));

    let err = h.controller.pause(PauseOptions::app()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::TransitionRefused {
            action: "pause",
            state: PlaybackState::Playing
        }
    ));

    h.sim.set_transitions(None);
    h.sim.emit_state(MediaState::Paused);
    settle().await;
    assert_eq!(h.pause_triggers(), vec![PauseTrigger::Device]);
}

#[tokio::test(start_paused = true)]
async fn test_growing_window_disables_auto_resume() {
    let h = Harness::live(WindowType::Growing, LiveSupport::Seekable);
    settle().await;
    h.controller.play().await.unwrap();
    h.controller.pause(PauseOptions::default()).await.unwrap();

    assert!(h.sim.calls_for(1).contains(&StrategyCall::Pause {
        disable_auto_resume: true
    }));
}

// =============================================================================
// Seeking Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_seek_marks_next_waiting() {
    let h = Harness::vod();
    settle().await;
    h.controller.play().await.unwrap();
    h.controller.set_current_time(42.0).await.unwrap();
    settle().await;

    let waiting = h.last_change();
    assert_eq!(waiting.state, PlaybackState::Waiting);
    assert_eq!(waiting.is_seeking, Some(true));
    assert_eq!(waiting.current_time, 42.0);

    h.sim.emit_state(MediaState::Waiting);
    settle().await;
    assert_eq!(h.last_change().is_seeking, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_seek_refused_by_transitions() {
    let h = Harness::vod();
    settle().await;
    h.sim.set_transitions(Some(Transitions::new(true, false)));

    let err = h.controller.set_current_time(10.0).await.unwrap_err();
    assert_eq!(err.error_code(), "TRANSITION_REFUSED");
    assert!(!h.controller.snapshot().await.unwrap().state.is_seeking);
}

#[tokio::test(start_paused = true)]
async fn test_live_restart_near_edge_plays_live() {
    let h = Harness::live(WindowType::Sliding, LiveSupport::Restartable);
    settle().await;
    h.controller.play().await.unwrap();
    h.controller.pause(PauseOptions::default()).await.unwrap();

    h.controller.set_current_time(3_590.0).await.unwrap();
    settle().await;

    assert_eq!(h.cdns.refresh_count(), 1);
    assert_eq!(
        h.sim.calls_for(2),
        vec![StrategyCall::Load {
            media_kind: Default::default(),
            start_time: None,
        }]
    );
    assert!(!h
        .sim
        .calls()
        .iter()
        .any(|(_, call)| matches!(call, StrategyCall::SetCurrentTime { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_live_restart_keeps_target_and_pause() {
    let h = Harness::live(WindowType::Growing, LiveSupport::Restartable);
    settle().await;
    h.controller.play().await.unwrap();
    h.controller.pause(PauseOptions::default()).await.unwrap();

    // manifest refresh reveals the window moved on by 20s
    h.cdns.stage_window(TimeWindow::new(
        LIVE_WINDOW_START + 20_000.0,
        LIVE_WINDOW_START + 3_620_000.0,
    ));
    h.controller.set_current_time(100.0).await.unwrap();
    settle().await;

    assert_eq!(
        h.sim.calls_for(2),
        vec![
            StrategyCall::Load {
                media_kind: Default::default(),
                start_time: Some(80.0),
            },
            StrategyCall::Pause {
                disable_auto_resume: true
            },
        ]
    );
    assert_eq!(h.sim.instances_alive(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_restart_refresh_failure_is_fatal() {
    let h = Harness::live(WindowType::Sliding, LiveSupport::Restartable);
    settle().await;
    h.controller.play().await.unwrap();
    h.cdns.set_refresh_failure(true);

    h.controller.set_current_time(100.0).await.unwrap();
    settle().await;

    let fatal = h.last_change();
    assert_eq!(fatal.state, PlaybackState::FatalError);
    assert_eq!(fatal.is_buffering_timeout_error, Some(false));
    assert_eq!(h.sim.instances_alive(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_live_restarts_run_one_at_a_time() {
    let (factory, sim) = SimulatedStrategyFactory::with_seekable_range(
        LiveSupport::Restartable,
        3_600.0,
        SeekableRange::new(0.0, 3_600.0),
    );
    let sources = Arc::new(GatedSources::default());
    let controller = SessionController::spawn(
        SessionOptions::live(WindowType::Sliding),
        Arc::new(factory),
        sources.clone(),
        Plugins::new(),
    )
    .unwrap();
    settle().await;
    controller.play().await.unwrap();

    controller.set_current_time(100.0).await.unwrap();
    controller.set_current_time(200.0).await.unwrap();
    settle().await;
    assert_eq!(sources.refreshes.load(Ordering::SeqCst), 1);

    sources.gate.notify_one();
    settle().await;
    assert_eq!(sources.refreshes.load(Ordering::SeqCst), 2);
    assert_eq!(sim.instances_created(), 2);

    sources.gate.notify_one();
    settle().await;
    assert_eq!(sim.instances_created(), 3);
    assert_eq!(
        sim.calls_for(3)[0],
        StrategyCall::Load {
            media_kind: Default::default(),
            start_time: Some(200.0),
        }
    );
}

// =============================================================================
// End of Stream & Ready Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_on_live_edge() {
    let h = Harness::live(WindowType::Sliding, LiveSupport::Seekable);
    let updates = Arc::new(Mutex::new(Vec::<TimeUpdate>::new()));
    let sink = Arc::clone(&updates);
    h.controller
        .on_time_update(move |update| sink.lock().push(*update));
    settle().await;

    h.sim.emit_time_update(3_580.0);
    h.sim.emit_time_update(3_595.0);
    settle().await;

    let flags: Vec<bool> = updates.lock().iter().map(|u| u.end_of_stream).collect();
    assert_eq!(flags, vec![false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_never_for_vod() {
    let h = Harness::vod();
    let updates = Arc::new(Mutex::new(Vec::<TimeUpdate>::new()));
    let sink = Arc::clone(&updates);
    h.controller
        .on_time_update(move |update| sink.lock().push(*update));
    settle().await;

    h.sim.emit_time_update(599.0);
    settle().await;
    assert!(!updates.lock()[0].end_of_stream);
}

#[tokio::test(start_paused = true)]
async fn test_ready_fires_once() {
    let h = Harness::vod();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    h.controller.on_ready(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    settle().await;
    h.controller.play().await.unwrap();
    h.sim.emit_time_update(5.0);
    settle().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let c = Arc::clone(&count);
    h.controller.on_ready(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Controller Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_everything() {
    let sources = Arc::new(GatedSources::default());
    let (factory, sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
    let controller = SessionController::spawn(
        SessionOptions::vod(),
        Arc::new(factory),
        sources.clone(),
        Plugins::new(),
    )
    .unwrap();
    settle().await;
    wait_secs(31).await;
    assert_eq!(sources.failovers.load(Ordering::SeqCst), 1);

    controller.tear_down().await.unwrap();
    sources.gate.notify_one();
    wait_secs(60).await;

    assert_eq!(sim.instances_created(), 1);
    assert_eq!(sim.instances_alive(), 0);
    let err = controller.play().await.unwrap_err();
    assert!(matches!(err, Error::ControllerClosed));
}

#[tokio::test(start_paused = true)]
async fn test_listener_removal() {
    let h = Harness::vod();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let id = h.controller.on_state_change(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    settle().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    assert!(h.controller.off_state_change(id));
    assert!(!h.controller.off_state_change(id));
    h.controller.play().await.unwrap();
    settle().await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_getters_and_playback_rate() {
    let h = Harness::vod();
    settle().await;

    assert_eq!(h.controller.duration().await.unwrap(), 600.0);
    assert_eq!(
        h.controller.seekable_range().await.unwrap(),
        SeekableRange::new(0.0, 600.0)
    );
    assert!(!h.controller.is_paused().await.unwrap());
    assert!(!h.controller.is_ended().await.unwrap());

    h.controller.set_playback_rate(1.5).await.unwrap();
    assert_eq!(h.controller.playback_rate().await.unwrap(), 1.5);
}

#[tokio::test(start_paused = true)]
async fn test_epoch_conversion() {
    let live = Harness::live(WindowType::Sliding, LiveSupport::Seekable);
    settle().await;
    assert_eq!(
        live.controller.video_time_to_epoch_ms(10.0).await.unwrap(),
        Some(LIVE_WINDOW_START + 10_000.0)
    );
    assert_eq!(
        live.controller
            .epoch_ms_to_video_time(LIVE_WINDOW_START + 2_500.0)
            .await
            .unwrap(),
        Some(2.5)
    );

    let vod = Harness::vod();
    assert_eq!(vod.controller.video_time_to_epoch_ms(10.0).await.unwrap(), None);
}

#[tokio::test]
async fn test_spawn_rejects_invalid_config() {
    let (factory, _sim) = SimulatedStrategyFactory::new(LiveSupport::Seekable, 600.0);
    let config = SessionConfig {
        fatal_error_timeout_ms: 0,
        ..Default::default()
    };
    let result = SessionController::spawn(
        SessionOptions::vod().with_config(config),
        Arc::new(factory),
        Arc::new(CdnList::new(["cdn-a"], TimeWindow::default())),
        Plugins::new(),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
