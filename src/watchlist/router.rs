use std::sync::Arc;

use crate::session::{SessionId, SessionObserver};
use crate::stream::StreamEvent;

use super::store::Watchlist;

/// Merges streamed results into the watchlist, but only for markets that are
/// already pinned. A result never creates an entry.
pub struct PinnedResultRouter {
    store: Arc<dyn Watchlist>,
    /// Restrict merging to one identity (per-entry refresh sessions).
    only: Option<String>,
}

impl PinnedResultRouter {
    pub fn new(store: Arc<dyn Watchlist>) -> Self {
        Self { store, only: None }
    }

    pub fn for_entry(store: Arc<dyn Watchlist>, item_id: impl Into<String>) -> Self {
        Self {
            store,
            only: Some(item_id.into()),
        }
    }
}

impl SessionObserver for PinnedResultRouter {
    fn on_event(&self, session: SessionId, event: &StreamEvent) {
        let StreamEvent::ItemResult(result) = event else {
            return;
        };
        let item_id = result.item.item_id.as_str();

        if self.only.as_deref().is_some_and(|only| only != item_id) {
            return;
        }
        if !self.store.has(item_id) {
            return;
        }

        tracing::debug!(session, item_id = %item_id, "Merging fresh result into pinned market");
        self.store.merge_refresh(item_id, &result.item);
    }
}
