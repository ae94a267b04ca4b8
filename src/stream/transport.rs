use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Url};

use crate::errors::TransportError;

use super::sse::{Frame, SseParser};

/// Ordered frames of one open stream. Ends when the server closes it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Opens an analysis stream for a query. Dropping the returned stream tears
/// the connection down.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    async fn open(&self, query: &str) -> Result<FrameStream, TransportError>;
}

/// SSE over HTTP: `GET {endpoint}?url=<query>`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    fn request_url(&self, query: &str) -> Result<Url, TransportError> {
        Url::parse_with_params(&self.endpoint, &[("url", query)])
            .map_err(|e| TransportError::Url(e.to_string()))
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, query: &str) -> Result<FrameStream, TransportError> {
        let url = self.request_url(query)?;
        tracing::debug!(url = %url, "Opening analysis stream");

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        let bytes = Box::pin(resp.bytes_stream());
        let state = (bytes, SseParser::new(), VecDeque::<Frame>::new());

        let frames = futures_util::stream::unfold(state, |(mut bytes, mut parser, mut pending)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((Ok(frame), (bytes, parser, pending)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => match parser.push(&chunk) {
                        Ok(frames) => pending.extend(frames),
                        Err(e) => return Some((Err(e), (bytes, parser, pending))),
                    },
                    Some(Err(e)) => {
                        return Some((
                            Err(TransportError::Read(e.to_string())),
                            (bytes, parser, pending),
                        ));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(frames))
    }
}
