use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::QueryError;
use crate::query::AnalysisQuery;
use crate::session::{
    AccumulatorSnapshot, ResultAccumulator, SessionController, SessionId, SessionObserver,
    Termination,
};
use crate::stream::StreamTransport;
use crate::watchlist::{entry_trend, PinnedResultRouter, Trend, Watchlist};

type RefreshMap<T> = HashMap<String, Arc<SessionController<T>>>;

/// Wires one top-level analysis session and any number of per-entry refresh
/// sessions to a shared watchlist.
///
/// Refresh sessions are independent of the top-level session; starting a new
/// refresh for an entry supersedes only that entry's previous refresh.
pub struct Scanner<T: StreamTransport> {
    transport: Arc<T>,
    store: Arc<dyn Watchlist>,
    accumulator: Arc<ResultAccumulator>,
    session: SessionController<T>,
    refreshes: Mutex<RefreshMap<T>>,
}

impl<T: StreamTransport> Scanner<T> {
    pub fn new(transport: Arc<T>, store: Arc<dyn Watchlist>) -> Self {
        let accumulator = Arc::new(ResultAccumulator::new());
        let session = SessionController::new("analysis", Arc::clone(&transport));
        session.subscribe(accumulator.clone());
        session.subscribe(Arc::new(PinnedResultRouter::new(Arc::clone(&store))));

        Self {
            transport,
            store,
            accumulator,
            session,
            refreshes: Mutex::new(HashMap::new()),
        }
    }

    /// Register an extra observer (e.g. a presentation adapter) on the
    /// top-level session.
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.session.subscribe(observer);
    }

    pub fn store(&self) -> &Arc<dyn Watchlist> {
        &self.store
    }

    pub fn session(&self) -> &SessionController<T> {
        &self.session
    }

    pub fn results(&self) -> AccumulatorSnapshot {
        self.accumulator.snapshot()
    }

    /// Validate the user input and start a top-level session for it.
    pub fn analyze(&self, input: &str) -> Result<SessionId, QueryError> {
        let query = AnalysisQuery::parse(input)?;
        Ok(self.session.start(&query.url()))
    }

    pub fn cancel(&self) {
        self.session.cancel();
    }

    pub async fn wait(&self, session: SessionId) -> Option<Termination> {
        self.session.wait_terminated(session).await
    }

    /// Pin the last result seen for `item_id` in the current session.
    /// Returns `false` if that market was never seen or is already pinned.
    pub fn pin(&self, item_id: &str) -> bool {
        match self.accumulator.latest(item_id) {
            Some(payload) => self.store.pin(&payload),
            None => {
                tracing::warn!(item_id = %item_id, "Cannot pin a market with no result in this session");
                false
            }
        }
    }

    /// Pin every flagged market of the current session. Returns how many
    /// new entries were created.
    pub fn pin_flagged(&self) -> usize {
        self.accumulator
            .flagged_ids()
            .iter()
            .filter(|id| self.pin(id))
            .count()
    }

    /// Remove the entry and drop its refresh controller, aborting any refresh
    /// still in flight for it.
    pub fn unpin(&self, item_id: &str) -> bool {
        let removed = self.refreshes().remove(item_id);
        if let Some(controller) = removed {
            controller.cancel();
        }
        self.store.unpin(item_id)
    }

    /// Number of entries with a refresh controller.
    pub fn refresh_count(&self) -> usize {
        self.refreshes().len()
    }

    pub fn trend(&self, item_id: &str) -> Option<Trend> {
        self.store.get(item_id).map(|entry| entry_trend(&entry))
    }

    fn refreshes(&self) -> MutexGuard<'_, RefreshMap<T>> {
        self.refreshes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Re-run the analysis for one pinned market and merge the result into its
    /// entry. Returns `None` if the entry is absent or has no refreshable URL.
    pub fn refresh_entry(&self, item_id: &str) -> Option<SessionId> {
        let entry = self.store.get(item_id)?;
        let Some(url) = entry.saved_result.market_url() else {
            tracing::warn!(item_id = %item_id, "Pinned market has no event slug, cannot refresh");
            return None;
        };

        let controller = {
            let mut refreshes = self.refreshes();
            Arc::clone(refreshes.entry(item_id.to_string()).or_insert_with(|| {
                let controller = SessionController::new(
                    format!("refresh:{item_id}"),
                    Arc::clone(&self.transport),
                );
                controller.subscribe(Arc::new(PinnedResultRouter::for_entry(
                    Arc::clone(&self.store),
                    item_id,
                )));
                Arc::new(controller)
            }))
        };

        Some(controller.start(&url))
    }

    pub async fn wait_refresh(&self, item_id: &str, session: SessionId) -> Option<Termination> {
        let controller = self.refreshes().get(item_id).cloned()?;
        controller.wait_terminated(session).await
    }

    /// Refresh every pinned market concurrently and wait for all of them.
    pub async fn refresh_all(&self) -> Vec<(String, Option<Termination>)> {
        let started: Vec<(String, SessionId)> = self
            .store
            .all()
            .into_iter()
            .filter_map(|entry| {
                let session = self.refresh_entry(&entry.item_id)?;
                Some((entry.item_id, session))
            })
            .collect();

        let waits = started.into_iter().map(|(item_id, session)| async move {
            let outcome = self.wait_refresh(&item_id, session).await;
            (item_id, outcome)
        });
        futures_util::future::join_all(waits).await
    }
}
