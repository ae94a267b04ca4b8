use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use polyscan::errors::TransportError;
use polyscan::models::{FlaggedSide, ResultPayload, SideAnalysis};
use polyscan::stream::{Frame, FrameStream, ItemResult, StreamTransport};

/// What the next `open()` call yields.
#[allow(dead_code)]
pub enum Script {
    /// Yield these frames, then end the stream.
    Frames(Vec<Frame>),
    /// Yield frames as the test pushes them; ends when the sender drops.
    Channel(mpsc::UnboundedReceiver<Frame>),
    /// Yield these frames, then a read error.
    FramesThenError(Vec<Frame>),
    /// Fail to connect.
    Refuse,
}

/// In-memory transport replaying one script per opened stream, in order.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open(&self, query: &str) -> Result<FrameStream, TransportError> {
        self.queries.lock().unwrap().push(query.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Frames(Vec::new()));

        match script {
            Script::Frames(frames) => Ok(Box::pin(futures_util::stream::iter(
                frames.into_iter().map(Ok::<Frame, TransportError>),
            ))),
            Script::FramesThenError(frames) => {
                let items = frames
                    .into_iter()
                    .map(Ok::<Frame, TransportError>)
                    .chain(std::iter::once(Err(TransportError::Read("connection reset".into()))));
                Ok(Box::pin(futures_util::stream::iter(items)))
            }
            Script::Channel(rx) => Ok(Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv()
                    .await
                    .map(|frame| (Ok::<Frame, TransportError>(frame), rx))
            }))),
            Script::Refuse => Err(TransportError::Read("connection refused".into())),
        }
    }
}

pub fn side(profitable_pct: Option<Decimal>) -> SideAnalysis {
    SideAnalysis {
        analyzed_count: 20,
        profitable_count: 10,
        losing_count: 8,
        unknown_count: 2,
        profitable_pct,
        avg_market_pnl: Some(Decimal::new(-1250, 2)),
        avg_lifetime_pnl: Some(Decimal::from(3_400)),
        total_position_size: Decimal::from(25_000),
        data_quality_score: Decimal::from(80),
    }
}

/// A valid result for `item_id` with the given YES price and YES profitable share.
pub fn payload(item_id: &str, yes_price: Decimal, yes_pct: Option<Decimal>) -> ResultPayload {
    ResultPayload {
        item_id: item_id.into(),
        title: format!("Will {item_id} resolve YES?"),
        event_slug: Some(format!("event-{item_id}")),
        market_slug: None,
        yes_price,
        no_price: Decimal::ONE - yes_price,
        for_side: side(yes_pct),
        against_side: side(Some(Decimal::new(40, 2))),
        flagged: false,
        flagged_side: FlaggedSide::None,
        imbalance_score: Decimal::new(12, 1),
        for_holders: vec![],
        against_holders: vec![],
    }
}

#[allow(dead_code)]
pub fn flagged(mut p: ResultPayload) -> ResultPayload {
    p.flagged = true;
    p.flagged_side = FlaggedSide::ForSide;
    p
}

#[allow(dead_code)]
pub fn progress_frame(current: u32, total: u32) -> Frame {
    Frame::new(
        "progress",
        serde_json::json!({ "message": "Analyzing", "current": current, "total": total }).to_string(),
    )
}

#[allow(dead_code)]
pub fn result_frame(index: u32, total: u32, item: &ResultPayload) -> Frame {
    let result = ItemResult {
        index,
        total,
        item: item.clone(),
    };
    Frame::new("market_result", serde_json::to_string(&result).unwrap())
}

#[allow(dead_code)]
pub fn complete_frame(completed: u32, flagged: u32) -> Frame {
    Frame::new(
        "complete",
        serde_json::json!({
            "total_markets": completed,
            "completed": completed,
            "flagged": flagged,
            "cached_wallets": 42,
            "api_calls": 7
        })
        .to_string(),
    )
}

#[allow(dead_code)]
pub fn error_frame(message: &str) -> Frame {
    Frame::new("error", serde_json::json!({ "message": message }).to_string())
}

/// A unique, not-yet-existing path under the system temp dir.
#[allow(dead_code)]
pub fn temp_watchlist_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("polyscan-test-{}", uuid::Uuid::new_v4()))
        .join("watchlist.json")
}
