use std::sync::{Mutex, MutexGuard};

use crate::models::ResultPayload;
use crate::stream::{CompletionSummary, ProgressUpdate, StreamEvent};

use super::observer::{SessionId, SessionObserver, Termination};

/// Read-only view of the active session's results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatorSnapshot {
    pub session: Option<SessionId>,
    /// In arrival order.
    pub results: Vec<ResultPayload>,
    pub received_count: usize,
    pub flagged_count: usize,
    pub last_total: Option<u32>,
    pub progress: Option<ProgressUpdate>,
    pub summary: Option<CompletionSummary>,
    pub termination: Option<Termination>,
}

/// Append-only result list for the active session. Reset at every start;
/// results already received stay visible after a failure.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    state: Mutex<AccumulatorSnapshot>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AccumulatorSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> AccumulatorSnapshot {
        self.lock().clone()
    }

    pub fn received_count(&self) -> usize {
        self.lock().received_count
    }

    pub fn flagged_count(&self) -> usize {
        self.lock().flagged_count
    }

    /// Most recent payload seen for `item_id` in the active session.
    pub fn latest(&self, item_id: &str) -> Option<ResultPayload> {
        self.lock()
            .results
            .iter()
            .rev()
            .find(|r| r.item_id == item_id)
            .cloned()
    }

    /// Identities of the flagged results, in arrival order.
    pub fn flagged_ids(&self) -> Vec<String> {
        self.lock()
            .results
            .iter()
            .filter(|r| r.flagged)
            .map(|r| r.item_id.clone())
            .collect()
    }
}

impl SessionObserver for ResultAccumulator {
    fn on_started(&self, session: SessionId, _query: &str) {
        *self.lock() = AccumulatorSnapshot {
            session: Some(session),
            ..AccumulatorSnapshot::default()
        };
    }

    fn on_event(&self, session: SessionId, event: &StreamEvent) {
        let mut state = self.lock();
        if state.session != Some(session) {
            return;
        }

        match event {
            StreamEvent::Progress(progress) => {
                state.last_total = Some(progress.total);
                state.progress = Some(progress.clone());
            }
            StreamEvent::ItemResult(result) => {
                state.received_count += 1;
                if result.item.flagged {
                    state.flagged_count += 1;
                }
                state.last_total = Some(result.total);
                state.results.push(result.item.clone());
            }
            StreamEvent::Complete(summary) => {
                state.summary = Some(summary.clone());
            }
            StreamEvent::Failure(_) => {}
        }
    }

    fn on_terminated(&self, session: SessionId, reason: &Termination) {
        let mut state = self.lock();
        if state.session == Some(session) {
            state.termination = Some(reason.clone());
        }
    }
}
