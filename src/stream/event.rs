use serde::{Deserialize, Serialize};

use crate::models::ResultPayload;

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub total: u32,
}

/// `market_result`: position counters plus the flattened result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub index: u32,
    pub total: u32,
    #[serde(flatten)]
    pub item: ResultPayload,
}

/// `error` with a message. `detail` and `index` are present when the server
/// attributes the failure to one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub message: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompletionSummary {
    #[serde(rename = "completed")]
    pub completed_count: u32,
    #[serde(rename = "flagged")]
    pub flagged_count: u32,
    #[serde(rename = "cached_wallets", default)]
    pub cached_key_count: u32,
    #[serde(rename = "api_calls", default)]
    pub external_call_count: u32,
    #[serde(default)]
    pub total_markets: Option<u32>,
}

// ---------------------------------------------------------------------------
// StreamEvent
// ---------------------------------------------------------------------------

/// The closed set of events a session can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress(ProgressUpdate),
    ItemResult(ItemResult),
    Failure(FailureReport),
    Complete(CompletionSummary),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Failure(_) | StreamEvent::Complete(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Progress(_) => "progress",
            StreamEvent::ItemResult(_) => "market_result",
            StreamEvent::Failure(_) => "error",
            StreamEvent::Complete(_) => "complete",
        }
    }
}
