use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::metrics::{WATCHLIST_PERSIST_ERRORS, WATCHLIST_REFRESHES};
use crate::models::{ResultPayload, WatchlistEntry, HISTORY_CAP};

use super::backend::WatchlistBackend;

const FORMAT_VERSION: u32 = 1;

/// The shared watchlist as seen by every caller.
///
/// All operations are total: storage failures are logged and swallowed, the
/// caller only learns whether the operation changed anything.
pub trait Watchlist: Send + Sync {
    /// Create an entry for `payload.item_id` if absent. Returns `true` if created.
    fn pin(&self, payload: &ResultPayload) -> bool;

    /// Remove the entry if present. Returns `true` if one was removed.
    fn unpin(&self, item_id: &str) -> bool;

    fn has(&self, item_id: &str) -> bool;

    /// Snapshot the entry's current result into its history, then replace it
    /// with `fresh`. No-op if `item_id` is not pinned.
    fn merge_refresh(&self, item_id: &str, fresh: &ResultPayload) -> bool;

    fn get(&self, item_id: &str) -> Option<WatchlistEntry>;

    /// Every entry in the order it was first pinned.
    fn all(&self) -> Vec<WatchlistEntry>;
}

#[derive(Debug, Serialize, Deserialize)]
struct WatchlistDocument {
    version: u32,
    entries: Vec<WatchlistEntry>,
}

/// Watchlist persisted under a single backend key.
///
/// Each operation is one read-modify-write of the whole document under a
/// process-wide lock; a failed write leaves the stored state unchanged.
pub struct WatchlistStore {
    backend: Box<dyn WatchlistBackend>,
    lock: Mutex<()>,
}

impl WatchlistStore {
    pub fn new(backend: impl WatchlistBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decode-or-default: missing, corrupt or foreign-version storage reads as empty.
    fn load(&self) -> Vec<WatchlistEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(e) => {
                counter!(WATCHLIST_PERSIST_ERRORS).increment(1);
                tracing::warn!(error = %e, "Watchlist unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<WatchlistEntry>, PersistenceError> {
        let Some(raw) = self.backend.load()? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let doc: WatchlistDocument = serde_json::from_str(&raw)?;
        if doc.version != FORMAT_VERSION {
            return Err(PersistenceError::Version(doc.version));
        }
        Ok(normalize(doc.entries))
    }

    fn save(&self, entries: Vec<WatchlistEntry>) -> bool {
        let doc = WatchlistDocument {
            version: FORMAT_VERSION,
            entries,
        };
        let result = serde_json::to_string_pretty(&doc)
            .map_err(PersistenceError::from)
            .and_then(|json| self.backend.save(&json));

        match result {
            Ok(()) => true,
            Err(e) => {
                counter!(WATCHLIST_PERSIST_ERRORS).increment(1);
                tracing::error!(error = %e, "Failed to persist watchlist");
                false
            }
        }
    }

    fn merge_at(&self, item_id: &str, fresh: &ResultPayload, now: DateTime<Utc>) -> bool {
        let _guard = self.guard();
        let mut entries = self.load();

        let Some(entry) = entries.iter_mut().find(|e| e.item_id == item_id) else {
            tracing::trace!(item_id = %item_id, "Refresh for unpinned market ignored");
            return false;
        };
        entry.absorb(fresh.clone(), now);
        let history_len = entry.history.len();

        if !self.save(entries) {
            return false;
        }
        counter!(WATCHLIST_REFRESHES).increment(1);
        tracing::info!(item_id = %item_id, history_len, "Watchlist entry refreshed");
        true
    }
}

impl Watchlist for WatchlistStore {
    fn pin(&self, payload: &ResultPayload) -> bool {
        let _guard = self.guard();
        let mut entries = self.load();

        if entries.iter().any(|e| e.item_id == payload.item_id) {
            tracing::debug!(item_id = %payload.item_id, "Market already pinned");
            return false;
        }
        entries.push(WatchlistEntry::new(payload.clone(), Utc::now()));

        let saved = self.save(entries);
        if saved {
            tracing::info!(item_id = %payload.item_id, title = %payload.title, "Market pinned");
        }
        saved
    }

    fn unpin(&self, item_id: &str) -> bool {
        let _guard = self.guard();
        let mut entries = self.load();

        let before = entries.len();
        entries.retain(|e| e.item_id != item_id);
        if entries.len() == before {
            return false;
        }

        let saved = self.save(entries);
        if saved {
            tracing::info!(item_id = %item_id, "Market unpinned");
        }
        saved
    }

    fn has(&self, item_id: &str) -> bool {
        let _guard = self.guard();
        self.load().iter().any(|e| e.item_id == item_id)
    }

    fn merge_refresh(&self, item_id: &str, fresh: &ResultPayload) -> bool {
        self.merge_at(item_id, fresh, Utc::now())
    }

    fn get(&self, item_id: &str) -> Option<WatchlistEntry> {
        let _guard = self.guard();
        self.load().into_iter().find(|e| e.item_id == item_id)
    }

    fn all(&self) -> Vec<WatchlistEntry> {
        let _guard = self.guard();
        self.load()
    }
}

/// Re-establish the store invariants on whatever was read back: one entry per
/// identity (first occurrence wins) and at most `HISTORY_CAP` snapshots.
fn normalize(entries: Vec<WatchlistEntry>) -> Vec<WatchlistEntry> {
    let mut out: Vec<WatchlistEntry> = Vec::with_capacity(entries.len());
    for mut entry in entries {
        if out.iter().any(|e| e.item_id == entry.item_id) {
            tracing::warn!(item_id = %entry.item_id, "Dropping duplicate watchlist entry");
            continue;
        }
        entry.history.truncate(HISTORY_CAP);
        out.push(entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SideAnalysis;
    use crate::watchlist::backend::MemoryBackend;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn payload(id: &str, yes_price: Decimal) -> ResultPayload {
        ResultPayload {
            item_id: id.into(),
            title: format!("Market {id}"),
            event_slug: Some("event".into()),
            market_slug: None,
            yes_price,
            no_price: Decimal::ONE - yes_price,
            for_side: SideAnalysis::default(),
            against_side: SideAnalysis::default(),
            flagged: false,
            flagged_side: Default::default(),
            imbalance_score: Decimal::ZERO,
            for_holders: vec![],
            against_holders: vec![],
        }
    }

    #[test]
    fn test_pin_is_not_a_refresh() {
        let store = WatchlistStore::new(MemoryBackend::new());
        assert!(store.pin(&payload("a", Decimal::new(40, 2))));
        assert!(!store.pin(&payload("a", Decimal::new(90, 2))));

        let entry = store.get("a").unwrap();
        assert_eq!(entry.saved_result.yes_price, Decimal::new(40, 2));
        assert!(entry.history.is_empty());
        assert!(entry.last_refreshed_at.is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_merge_snapshots_prior_state_first() {
        let store = WatchlistStore::new(MemoryBackend::new());
        store.pin(&payload("a", Decimal::new(40, 2)));

        let now = Utc::now() + Duration::minutes(5);
        assert!(store.merge_at("a", &payload("a", Decimal::new(45, 2)), now));

        let entry = store.get("a").unwrap();
        assert_eq!(entry.saved_result.yes_price, Decimal::new(45, 2));
        assert_eq!(entry.history.len(), 1);
        assert_eq!(entry.history[0].yes_price, Decimal::new(40, 2));
        assert_eq!(entry.history[0].captured_at, now);
        assert_eq!(entry.last_refreshed_at, Some(now));
    }

    #[test]
    fn test_corrupt_storage_reads_as_empty_and_is_repaired() {
        let store = WatchlistStore::new(MemoryBackend::with_contents("{ not json"));
        assert!(store.all().is_empty());
        assert!(!store.has("a"));

        assert!(store.pin(&payload("a", Decimal::new(50, 2))));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_foreign_version_reads_as_empty() {
        let store = WatchlistStore::new(MemoryBackend::with_contents(
            r#"{"version": 99, "entries": []}"#,
        ));
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_normalize_drops_duplicates_and_caps_history() {
        let mut first = WatchlistEntry::new(payload("a", Decimal::new(10, 2)), Utc::now());
        for i in 0..15 {
            first.absorb(payload("a", Decimal::new(i, 2)), Utc::now());
        }
        first.history.extend(first.history.clone());
        let dup = WatchlistEntry::new(payload("a", Decimal::new(99, 2)), Utc::now());

        let entries = normalize(vec![first, dup]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].history.len(), HISTORY_CAP);
        assert_eq!(entries[0].saved_result.yes_price, Decimal::new(14, 2));
    }
}
