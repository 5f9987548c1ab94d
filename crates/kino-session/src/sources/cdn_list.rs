//! In-memory CDN list

use super::SourceDirectory;
use crate::{
    types::{FailoverRequest, TimeWindow},
    Error, Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug)]
struct CdnState {
    cdns: VecDeque<String>,
    window: TimeWindow,
    /// Window published on the next refresh or failover
    staged_window: Option<TimeWindow>,
    fail_refresh: bool,
    requests: Vec<FailoverRequest>,
    refreshes: usize,
}

/// Ordered CDN list; failover drops the front entry
#[derive(Debug)]
pub struct CdnList {
    state: Mutex<CdnState>,
}

impl CdnList {
    pub fn new<I, S>(cdns: I, window: TimeWindow) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(CdnState {
                cdns: cdns.into_iter().map(Into::into).collect(),
                window,
                staged_window: None,
                fail_refresh: false,
                requests: Vec::new(),
                refreshes: 0,
            }),
        }
    }

    /// CDN currently in use
    pub fn current(&self) -> Option<String> {
        self.state.lock().cdns.front().cloned()
    }

    /// CDNs still available, in failover order
    pub fn cdns(&self) -> Vec<String> {
        self.state.lock().cdns.iter().cloned().collect()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().cdns.len()
    }

    /// Publish `window` on the next refresh or failover, as a live manifest would
    pub fn stage_window(&self, window: TimeWindow) {
        self.state.lock().staged_window = Some(window);
    }

    /// Replace the window immediately
    pub fn set_window(&self, window: TimeWindow) {
        self.state.lock().window = window;
    }

    /// Make subsequent refreshes fail
    pub fn set_refresh_failure(&self, fail: bool) {
        self.state.lock().fail_refresh = fail;
    }

    /// Failover requests received so far
    pub fn failover_requests(&self) -> Vec<FailoverRequest> {
        self.state.lock().requests.clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().refreshes
    }
}

#[async_trait]
impl SourceDirectory for CdnList {
    fn time(&self) -> TimeWindow {
        self.state.lock().window
    }

    async fn failover(&self, request: FailoverRequest) -> Result<()> {
        let mut state = self.state.lock();
        state.requests.push(request);

        let failed = state.cdns.pop_front();
        if let Some(window) = state.staged_window.take() {
            state.window = window;
        }

        match state.cdns.front() {
            Some(next) => {
                info!(failed = ?failed, next = %next, "Failing over to next CDN");
                Ok(())
            }
            None => {
                warn!(failed = ?failed, "No CDNs left");
                Err(Error::SourcesExhausted)
            }
        }
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.refreshes += 1;

        if state.fail_refresh {
            return Err(Error::RefreshFailed(format!(
                "manifest unavailable on {}",
                state.cdns.front().map(String::as_str).unwrap_or("no cdn")
            )));
        }
        if let Some(window) = state.staged_window.take() {
            state.window = window;
        }
        Ok(())
    }
}
