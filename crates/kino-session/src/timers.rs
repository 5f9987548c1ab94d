//! Escalation timers
//!
//! One optional handle per timer kind. Arming always cancels the previous
//! handle of the same kind, and every expiry carries a token so an expiry
//! that was already queued when its timer got cancelled is recognised as
//! stale.

use crate::controller::Input;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Timer kinds owned by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Stall escalation, armed on WAITING
    Buffering,
    /// Error escalation, armed on strategy errors
    FatalError,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::Buffering => write!(f, "buffering"),
            TimerKind::FatalError => write!(f, "fatal_error"),
        }
    }
}

struct ArmedTimer {
    token: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct SessionTimers {
    inbox: mpsc::UnboundedSender<Input>,
    buffering: Option<ArmedTimer>,
    fatal_error: Option<ArmedTimer>,
    next_token: u64,
}

impl SessionTimers {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Input>) -> Self {
        Self {
            inbox,
            buffering: None,
            fatal_error: None,
            next_token: 0,
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<ArmedTimer> {
        match kind {
            TimerKind::Buffering => &mut self.buffering,
            TimerKind::FatalError => &mut self.fatal_error,
        }
    }

    /// Arm `kind` to expire after `after`, replacing any pending timer of that kind
    pub(crate) fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.cancel(kind);

        let token = self.next_token;
        self.next_token += 1;
        let inbox = self.inbox.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = inbox.send(Input::Timer { kind, token });
        });

        trace!(timer = %kind, token, after_ms = after.as_millis() as u64, "Timer armed");
        *self.slot(kind) = Some(ArmedTimer { token, handle });
    }

    /// Cancel `kind`, returns true if a timer was pending
    pub(crate) fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slot(kind).take() {
            Some(timer) => {
                timer.handle.abort();
                trace!(timer = %kind, token = timer.token, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        self.cancel(TimerKind::Buffering);
        self.cancel(TimerKind::FatalError);
    }

    pub(crate) fn is_pending(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Buffering => self.buffering.is_some(),
            TimerKind::FatalError => self.fatal_error.is_some(),
        }
    }

    /// Accept an expiry; false when it belongs to a timer no longer pending
    pub(crate) fn claim(&mut self, kind: TimerKind, token: u64) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|t| t.token == token) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
