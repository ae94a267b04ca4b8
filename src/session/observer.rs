use std::fmt;

use crate::stream::{CompletionSummary, StreamEvent};

/// Generation number of a session. Strictly increasing per controller.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Terminated,
}

impl SessionState {
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Streaming)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Why a session reached `Terminated`. Exactly one per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed(CompletionSummary),
    /// Application failure; the message is shown to the user verbatim.
    Failed(String),
    ConnectionLost,
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed(_) => "completed",
            Termination::Failed(_) => "failed",
            Termination::ConnectionLost => "connection_lost",
            Termination::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed(summary) => write!(
                f,
                "Analysis complete: {} market(s), {} flagged",
                summary.completed_count, summary.flagged_count
            ),
            Termination::Failed(message) => write!(f, "{message}"),
            Termination::ConnectionLost => write!(f, "Connection lost. Please try again."),
            Termination::Cancelled => write!(f, "Analysis cancelled"),
        }
    }
}

/// Receives session lifecycle and events.
///
/// Callbacks run synchronously on the controller's delivery path while it
/// holds its session lock, so an observer must not call back into the
/// controller that notifies it.
pub trait SessionObserver: Send + Sync {
    fn on_started(&self, _session: SessionId, _query: &str) {}

    fn on_event(&self, session: SessionId, event: &StreamEvent);

    fn on_terminated(&self, _session: SessionId, _reason: &Termination) {}
}
