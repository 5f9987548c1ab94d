//! Scenario files for the session simulator

use anyhow::Context;
use kino_session::{
    LiveSupport, MediaState, PauseOptions, SeekableRange, SessionOptions, TimeWindow,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scripted playback session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub options: SessionOptions,

    #[serde(default)]
    pub live_support: LiveSupport,

    /// Media duration in seconds
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Defaults to `0..duration`
    #[serde(default)]
    pub seekable_range: Option<SeekableRange>,

    /// CDNs in failover order
    pub cdns: Vec<String>,

    #[serde(default)]
    pub window: TimeWindow,

    pub steps: Vec<Step>,
}

fn default_duration() -> f64 {
    600.0
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Advance the virtual clock
    Wait { ms: u64 },
    Play,
    Pause {
        #[serde(flatten)]
        options: PauseOptions,
    },
    Seek { time: f64 },
    SetPlaybackRate { rate: f64 },

    // Engine behaviour
    EmitState { state: MediaState },
    EmitTimeUpdate { time: f64 },
    EmitError { code: u32, message: String },

    // Source directory behaviour
    StageWindow { window: TimeWindow },
    FailRefresh { fail: bool },
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        if scenario.cdns.is_empty() {
            anyhow::bail!("scenario needs at least one CDN");
        }
        scenario.options.config.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn seekable_range(&self) -> SeekableRange {
        self.seekable_range
            .unwrap_or_else(|| SeekableRange::new(0.0, self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kino_session::WindowType;

    #[test]
    fn test_parse_scenario() {
        let json = r#"{
            "name": "stall",
            "options": { "window_type": "sliding", "is_live": true },
            "live_support": "restartable",
            "cdns": ["a", "b"],
            "steps": [
                { "action": "play" },
                { "action": "pause", "user_pause": false },
                { "action": "emit_state", "state": "WAITING" },
                { "action": "wait", "ms": 31000 }
            ]
        }"#;

        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.options.window_type, WindowType::Sliding);
        assert_eq!(scenario.live_support, LiveSupport::Restartable);
        assert_eq!(scenario.duration, 600.0);
        assert_eq!(
            scenario.steps[1],
            Step::Pause {
                options: PauseOptions::app()
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::EmitState {
                state: MediaState::Waiting
            }
        );
    }

    #[test]
    fn test_scenario_requires_cdns() {
        let json = r#"{ "cdns": [], "steps": [] }"#;
        assert!(Scenario::from_json(json).is_err());
    }

    #[test]
    fn test_demo_scenarios_parse() {
        for json in [
            include_str!("../../../demos/cdn_stall.json"),
            include_str!("../../../demos/live_restart.json"),
            include_str!("../../../demos/fatal_error.json"),
        ] {
            let scenario = Scenario::from_json(json).unwrap();
            assert!(scenario.name.is_some());
            assert!(!scenario.steps.is_empty());
        }
    }
}
