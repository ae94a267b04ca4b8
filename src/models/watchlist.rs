use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{FlaggedSide, ResultPayload};

/// Maximum number of prior snapshots kept per entry.
pub const HISTORY_CAP: usize = 10;

/// A reduced projection of a prior `ResultPayload`, captured just before the
/// entry's saved result was overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub captured_at: DateTime<Utc>,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub yes_profitable_pct: Option<Decimal>,
    pub no_profitable_pct: Option<Decimal>,
    pub flagged: bool,
    pub flagged_side: FlaggedSide,
    pub imbalance_score: Decimal,
}

impl HistorySnapshot {
    pub fn capture(prior: &ResultPayload, captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            yes_price: prior.yes_price,
            no_price: prior.no_price,
            yes_profitable_pct: prior.for_side.profitable_pct,
            no_profitable_pct: prior.against_side.profitable_pct,
            flagged: prior.flagged,
            flagged_side: prior.flagged_side,
            imbalance_score: prior.imbalance_score,
        }
    }
}

/// A pinned market. Keyed by `item_id`; history is newest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub item_id: String,
    pub saved_result: ResultPayload,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<HistorySnapshot>,
}

impl WatchlistEntry {
    pub fn new(payload: ResultPayload, saved_at: DateTime<Utc>) -> Self {
        Self {
            item_id: payload.item_id.clone(),
            saved_result: payload,
            saved_at,
            last_refreshed_at: None,
            history: Vec::new(),
        }
    }

    /// Snapshot the current result, then overwrite it with `fresh`.
    pub fn absorb(&mut self, fresh: ResultPayload, now: DateTime<Utc>) {
        let snapshot = HistorySnapshot::capture(&self.saved_result, now);
        self.history.insert(0, snapshot);
        self.history.truncate(HISTORY_CAP);
        self.saved_result = fresh;
        self.last_refreshed_at = Some(now);
    }

    pub fn latest_snapshot(&self) -> Option<&HistorySnapshot> {
        self.history.first()
    }
}
