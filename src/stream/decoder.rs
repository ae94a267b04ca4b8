use serde::de::DeserializeOwned;

use crate::errors::DecodeError;

use super::event::{CompletionSummary, FailureReport, ItemResult, ProgressUpdate, StreamEvent};
use super::sse::Frame;

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(StreamEvent),
    /// An `error` frame with no payload: the connection failed, there is no
    /// application message to show.
    TransportSignal,
    /// Event name this client does not know. Skipped silently.
    Ignored,
}

/// Turn one raw frame into a typed event.
pub fn decode_frame(frame: &Frame) -> Result<Decoded, DecodeError> {
    let event = match frame.event.as_str() {
        "progress" => StreamEvent::Progress(parse::<ProgressUpdate>(frame)?),
        "market_result" => {
            let result = parse::<ItemResult>(frame)?;
            result.item.validate().map_err(|reason| DecodeError::Invalid {
                event: frame.event.clone(),
                reason,
            })?;
            StreamEvent::ItemResult(result)
        }
        "error" => {
            if frame.data.trim().is_empty() {
                return Ok(Decoded::TransportSignal);
            }
            StreamEvent::Failure(parse::<FailureReport>(frame)?)
        }
        "complete" => StreamEvent::Complete(parse::<CompletionSummary>(frame)?),
        other => {
            tracing::trace!(event = %other, "Ignoring unknown stream event");
            return Ok(Decoded::Ignored);
        }
    };
    Ok(Decoded::Event(event))
}

fn parse<T: DeserializeOwned>(frame: &Frame) -> Result<T, DecodeError> {
    serde_json::from_str(&frame.data).map_err(|source| DecodeError::Json {
        event: frame.event.clone(),
        source,
    })
}
