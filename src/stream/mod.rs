pub mod decoder;
pub mod event;
pub mod sse;
pub mod transport;

pub use decoder::{decode_frame, Decoded};
pub use event::{CompletionSummary, FailureReport, ItemResult, ProgressUpdate, StreamEvent};
pub use sse::{Frame, SseParser};
pub use transport::{FrameStream, HttpTransport, StreamTransport};
