use thiserror::Error;

/// A frame whose payload does not match the structure expected for its event
/// name. Logged by the session and skipped; never terminates a session.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {event} payload: {source}")]
    Json {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {event} payload: {reason}")]
    Invalid { event: String, reason: String },
}

/// Connection-level failure. Carries no application message, the user only
/// ever sees a generic "connection lost".
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("stream line exceeded {0} bytes without a newline")]
    LineTooLong(usize),
}

/// Watchlist storage failure. Swallowed at the store boundary.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("watchlist serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported watchlist version {0}")]
    Version(u32),
}

/// User-supplied market identifier that cannot be turned into a query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty market URL")]
    Empty,

    #[error("Invalid Polymarket URL. Expected https://polymarket.com/event/{{event-slug}} or https://polymarket.com/event/{{event-slug}}/{{market-slug}}")]
    NotPolymarket,
}
