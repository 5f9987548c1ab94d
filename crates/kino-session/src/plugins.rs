//! Plugin bus
//!
//! Fan-out of intermediate session notifications for observability:
//! - Buffering raised / cleared
//! - Strategy errors raised / cleared
//! - Fatal errors
//!
//! Plugins are fire-and-forget: nothing they return is consumed.

use crate::types::{SessionId, StrategyError};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Notification delivered to plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PluginEvent {
    /// Strategy started buffering
    Buffering,

    /// Buffering ended, either by recovery or escalation
    BufferingCleared { is_initial_play: bool },

    /// Strategy reported an error
    Error { code: u32, message: String },

    /// A previously raised error no longer applies
    ErrorCleared,

    /// Session gave up
    FatalError { is_buffering_timeout_error: bool },
}

/// Observer of plugin notifications
///
/// Every method has a no-op default so plugins implement only what they need.
pub trait Plugin: Send + Sync {
    fn on_buffering(&self, _session: SessionId) {}

    fn on_buffering_cleared(&self, _session: SessionId, _is_initial_play: bool) {}

    fn on_error(&self, _session: SessionId, _error: &StrategyError) {}

    fn on_error_cleared(&self, _session: SessionId) {}

    fn on_fatal_error(&self, _session: SessionId, _is_buffering_timeout_error: bool) {}
}

/// Registry of plugins shared by every session that was handed a clone
#[derive(Clone, Default)]
pub struct Plugins {
    plugins: Arc<RwLock<Vec<Arc<dyn Plugin>>>>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin; registering the same `Arc` twice is a no-op
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let mut plugins = self.plugins.write();
        if plugins.iter().any(|p| same_plugin(p, &plugin)) {
            return;
        }
        plugins.push(plugin);
    }

    /// Unregister a plugin, returns false if it was not registered
    pub fn unregister(&self, plugin: &Arc<dyn Plugin>) -> bool {
        let mut plugins = self.plugins.write();
        let before = plugins.len();
        plugins.retain(|p| !same_plugin(p, plugin));
        plugins.len() != before
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Deliver an event to every registered plugin
    pub fn dispatch(&self, session: SessionId, event: &PluginEvent) {
        let plugins = self.plugins.read().clone();
        for plugin in plugins {
            match event {
                PluginEvent::Buffering => plugin.on_buffering(session),
                PluginEvent::BufferingCleared { is_initial_play } => {
                    plugin.on_buffering_cleared(session, *is_initial_play)
                }
                PluginEvent::Error { code, message } => {
                    plugin.on_error(session, &StrategyError::new(*code, message.clone()))
                }
                PluginEvent::ErrorCleared => plugin.on_error_cleared(session),
                PluginEvent::FatalError {
                    is_buffering_timeout_error,
                } => plugin.on_fatal_error(session, *is_buffering_timeout_error),
            }
        }
    }
}

fn same_plugin(a: &Arc<dyn Plugin>, b: &Arc<dyn Plugin>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Forwards plugin notifications to `tracing`
#[derive(Debug, Default)]
pub struct TracingPlugin;

impl Plugin for TracingPlugin {
    fn on_buffering(&self, session: SessionId) {
        info!(session_id = %session, "Buffering");
    }

    fn on_buffering_cleared(&self, session: SessionId, is_initial_play: bool) {
        info!(session_id = %session, is_initial_play, "Buffering cleared");
    }

    fn on_error(&self, session: SessionId, error: &StrategyError) {
        warn!(session_id = %session, code = error.code, message = %error.message, "Strategy error");
    }

    fn on_error_cleared(&self, session: SessionId) {
        info!(session_id = %session, "Error cleared");
    }

    fn on_fatal_error(&self, session: SessionId, is_buffering_timeout_error: bool) {
        warn!(session_id = %session, is_buffering_timeout_error, "Fatal error");
    }
}

/// Plugin event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEventRecord {
    /// Session ID
    pub session_id: SessionId,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number
    pub sequence: u64,
    /// The event
    #[serde(flatten)]
    pub event: PluginEvent,
}

/// Keeps every notification it receives, in order
#[derive(Debug, Default)]
pub struct EventLog {
    records: Mutex<Vec<PluginEventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PluginEventRecord> {
        self.records.lock().clone()
    }

    /// Events without metadata
    pub fn events(&self) -> Vec<PluginEvent> {
        self.records.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, session_id: SessionId, event: PluginEvent) {
        let mut records = self.records.lock();
        let sequence = records.len() as u64;
        records.push(PluginEventRecord {
            session_id,
            timestamp: Utc::now(),
            sequence,
            event,
        });
    }
}

impl Plugin for EventLog {
    fn on_buffering(&self, session: SessionId) {
        self.push(session, PluginEvent::Buffering);
    }

    fn on_buffering_cleared(&self, session: SessionId, is_initial_play: bool) {
        self.push(session, PluginEvent::BufferingCleared { is_initial_play });
    }

    fn on_error(&self, session: SessionId, error: &StrategyError) {
        self.push(
            session,
            PluginEvent::Error {
                code: error.code,
                message: error.message.clone(),
            },
        );
    }

    fn on_error_cleared(&self, session: SessionId) {
        self.push(session, PluginEvent::ErrorCleared);
    }

    fn on_fatal_error(&self, session: SessionId, is_buffering_timeout_error: bool) {
        self.push(
            session,
            PluginEvent::FatalError {
                is_buffering_timeout_error,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_reaches_every_plugin() {
        let plugins = Plugins::new();
        let first = Arc::new(EventLog::new());
        let second = Arc::new(EventLog::new());
        plugins.register(first.clone());
        plugins.register(second.clone());

        let session = SessionId::new();
        plugins.dispatch(session, &PluginEvent::Buffering);
        plugins.dispatch(
            session,
            &PluginEvent::FatalError {
                is_buffering_timeout_error: true,
            },
        );

        for log in [&first, &second] {
            assert_eq!(
                log.events(),
                vec![
                    PluginEvent::Buffering,
                    PluginEvent::FatalError {
                        is_buffering_timeout_error: true
                    }
                ]
            );
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let plugins = Plugins::new();
        let log: Arc<dyn Plugin> = Arc::new(EventLog::new());

        plugins.register(Arc::clone(&log));
        plugins.register(Arc::clone(&log));
        assert_eq!(plugins.len(), 1);

        assert!(plugins.unregister(&log));
        assert!(!plugins.unregister(&log));
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_record_serialization() {
        let log = EventLog::new();
        log.on_buffering_cleared(SessionId::new(), true);

        let json = serde_json::to_string(&log.records()[0]).unwrap();
        assert!(json.contains("\"event\":\"buffering_cleared\""));
        assert!(json.contains("\"is_initial_play\":true"));
    }
}
