//! Kino Session - Playback Session Controller for Kino
//!
//! This crate sits between a player UI and an interchangeable playback
//! engine ("strategy"):
//! - Normalizes strategy events into one public state model
//! - Buffering and error timeouts with automatic CDN failover
//! - Live-stream restart on platforms that cannot seek in place
//! - Pause attribution (user, app, device) and end-of-stream detection
//! - One-shot ready notification and a plugin bus for diagnostics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Kino Session                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   SessionController  ──commands/queries──┐                      │
//! │                                          ▼                      │
//! │  ┌──────────────┐   events   ┌──────────────────────┐           │
//! │  │   Strategy   │──────────► │     Session task     │           │
//! │  │  (adapter)   │ ◄───────── │  ┌────────────────┐  │           │
//! │  └──────────────┘  commands  │  │  Orchestrator  │  │           │
//! │                              │  │ timers, reloads│  │           │
//! │  ┌──────────────┐  failover  │  └───────┬────────┘  │           │
//! │  │    Source    │ ◄───────── │          │           │           │
//! │  │  Directory   │ ─────────► │  ┌───────┴────────┐  │           │
//! │  └──────────────┘  outcome   │  │   Aggregator   │  │           │
//! │                              │  └───────┬────────┘  │           │
//! │                              └──────────┼───────────┘           │
//! │                                         │                       │
//! │  ┌──────────────┐        ┌──────────────┴──┐                    │
//! │  │  Plugin Bus  │        │ State / Time /  │                    │
//! │  │              │        │ Ready listeners │                    │
//! │  └──────────────┘        └─────────────────┘                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod state;
pub mod listeners;
pub mod plugins;
pub mod strategy;
pub mod sources;
pub mod controller;
mod timers;
mod aggregator;
mod orchestrator;

pub use error::{Error, Result};
pub use types::*;
pub use config::{SessionConfig, SessionOptions};
pub use state::SessionState;
pub use listeners::{ListenerId, ReadyGate};
pub use plugins::{EventLog, Plugin, PluginEvent, PluginEventRecord, Plugins, TracingPlugin};
pub use strategy::{
    SimulatedStrategyFactory, SimulationHandle, Strategy, StrategyCall, StrategyEventSink,
    StrategyFactory, Transitions,
};
pub use sources::{CdnList, SourceDirectory};
pub use controller::{SessionController, SessionSnapshot};
pub use timers::TimerKind;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the session library
pub fn init() {
    tracing::info!(version = VERSION, "Kino Session initialized");
}
