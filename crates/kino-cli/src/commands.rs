//! CLI command implementations

use crate::output::{render_report, Channel, OutputFormat, SimulationReport, TimelineEntry};
use crate::scenario::{Scenario, Step};
use kino_session::{
    CdnList, PlaybackState, Plugin, Plugins, SessionConfig, SessionController, SessionId,
    SimulatedStrategyFactory, SimulationHandle, StrategyError, TracingPlugin,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Shared, virtual-clock-stamped event timeline
#[derive(Clone)]
struct Timeline {
    started: Instant,
    entries: Arc<Mutex<Vec<TimelineEntry>>>,
}

impl Timeline {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, channel: Channel, detail: impl Serialize) {
        let entry = TimelineEntry {
            at_ms: self.started.elapsed().as_millis() as u64,
            channel,
            detail: serde_json::to_value(detail).unwrap_or_default(),
        };
        self.entries.lock().push(entry);
    }

    fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.lock().clone()
    }
}

/// Writes plugin notifications into the timeline
struct TimelinePlugin {
    timeline: Timeline,
}

impl Plugin for TimelinePlugin {
    fn on_buffering(&self, _session: SessionId) {
        self.timeline.record(Channel::Plugin, json!({ "event": "buffering" }));
    }

    fn on_buffering_cleared(&self, _session: SessionId, is_initial_play: bool) {
        self.timeline.record(
            Channel::Plugin,
            json!({ "event": "buffering_cleared", "is_initial_play": is_initial_play }),
        );
    }

    fn on_error(&self, _session: SessionId, error: &StrategyError) {
        self.timeline.record(
            Channel::Plugin,
            json!({ "event": "error", "code": error.code, "message": error.message }),
        );
    }

    fn on_error_cleared(&self, _session: SessionId) {
        self.timeline.record(Channel::Plugin, json!({ "event": "error_cleared" }));
    }

    fn on_fatal_error(&self, _session: SessionId, is_buffering_timeout_error: bool) {
        self.timeline.record(
            Channel::Plugin,
            json!({
                "event": "fatal_error",
                "is_buffering_timeout_error": is_buffering_timeout_error
            }),
        );
    }
}

/// Run a scenario file against the simulated strategy
pub fn simulate(path: &Path, format: OutputFormat, trace_plugin: bool) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(path)?;
    info!(scenario = ?scenario.name, steps = scenario.steps.len(), "Running scenario");

    // Scenarios wait on escalation timers; run them on a paused clock
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()?;
    let report = runtime.block_on(run_scenario(scenario, trace_plugin))?;

    println!("{}", render_report(&report, format));
    Ok(())
}

async fn run_scenario(scenario: Scenario, trace_plugin: bool) -> anyhow::Result<SimulationReport> {
    let timeline = Timeline::new();

    let (factory, sim) = SimulatedStrategyFactory::with_seekable_range(
        scenario.live_support,
        scenario.duration,
        scenario.seekable_range(),
    );
    let cdns = Arc::new(CdnList::new(scenario.cdns.iter().cloned(), scenario.window));

    let plugins = Plugins::new();
    plugins.register(Arc::new(TimelinePlugin {
        timeline: timeline.clone(),
    }));
    if trace_plugin {
        plugins.register(Arc::new(TracingPlugin));
    }

    let controller = SessionController::spawn(
        scenario.options.clone(),
        Arc::new(factory),
        cdns.clone(),
        plugins,
    )?;

    let states = timeline.clone();
    controller.on_state_change(move |change| states.record(Channel::State, change));
    let times = timeline.clone();
    controller.on_time_update(move |update| times.record(Channel::Time, update));
    let ready = timeline.clone();
    controller.on_ready(move || ready.record(Channel::Step, json!({ "event": "ready" })));

    settle().await;
    for step in &scenario.steps {
        run_step(step, &controller, &sim, &cdns, &timeline).await;
        settle().await;
    }

    let final_state = controller
        .state()
        .await
        .unwrap_or(PlaybackState::Stopped)
        .to_string();
    controller.tear_down().await?;

    Ok(SimulationReport {
        scenario: scenario.name.clone(),
        final_state,
        failovers: cdns.failover_requests().len(),
        refreshes: cdns.refresh_count(),
        strategy_instances: sim.instances_created(),
        remaining_cdns: cdns.cdns(),
        timeline: timeline.entries(),
    })
}

async fn run_step(
    step: &Step,
    controller: &SessionController,
    sim: &SimulationHandle,
    cdns: &CdnList,
    timeline: &Timeline,
) {
    debug!(?step, "Step");
    if !matches!(step, Step::Wait { .. }) {
        timeline.record(Channel::Step, step);
    }

    let result = match step {
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(())
        }
        Step::Play => controller.play().await,
        Step::Pause { options } => controller.pause(*options).await,
        Step::Seek { time } => controller.set_current_time(*time).await,
        Step::SetPlaybackRate { rate } => controller.set_playback_rate(*rate).await,
        Step::EmitState { state } => {
            sim.emit_state(*state);
            Ok(())
        }
        Step::EmitTimeUpdate { time } => {
            sim.emit_time_update(*time);
            Ok(())
        }
        Step::EmitError { code, message } => {
            sim.emit_error(StrategyError::new(*code, message.clone()));
            Ok(())
        }
        Step::StageWindow { window } => {
            cdns.stage_window(*window);
            Ok(())
        }
        Step::FailRefresh { fail } => {
            cdns.set_refresh_failure(*fail);
            Ok(())
        }
    };

    if let Err(e) = result {
        timeline.record(
            Channel::Step,
            json!({ "rejected": e.to_string(), "code": e.error_code() }),
        );
    }
}

/// Let the session task drain its inbox
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Print the default configuration, or validate a configuration file
pub fn config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = match path {
        Some(path) => {
            let config = SessionConfig::from_file(path)?;
            println!("Configuration is valid: {}", path.display());
            config
        }
        None => SessionConfig::default(),
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
