use metrics::{counter, describe_counter};

pub const STREAM_FRAMES: &str = "stream_frames_total";
pub const STREAM_DECODE_ERRORS: &str = "stream_decode_errors_total";
pub const SESSIONS_STARTED: &str = "sessions_started_total";
pub const SESSIONS_TERMINATED: &str = "sessions_terminated_total";
pub const WATCHLIST_REFRESHES: &str = "watchlist_refreshes_total";
pub const WATCHLIST_PERSIST_ERRORS: &str = "watchlist_persist_errors_total";

/// Register descriptions for every counter the core emits.
/// Without an installed recorder the macros are no-ops.
pub fn describe_metrics() {
    describe_counter!(STREAM_FRAMES, "Frames received from the analysis stream");
    describe_counter!(STREAM_DECODE_ERRORS, "Frames skipped because their payload failed to decode");
    describe_counter!(SESSIONS_STARTED, "Analysis sessions opened");
    describe_counter!(SESSIONS_TERMINATED, "Analysis sessions terminated, by reason");
    describe_counter!(WATCHLIST_REFRESHES, "Watchlist entries merged with a fresh result");
    describe_counter!(WATCHLIST_PERSIST_ERRORS, "Watchlist reads or writes that failed");

    // Pre-register so they appear before the first increment.
    counter!(STREAM_FRAMES).absolute(0);
    counter!(STREAM_DECODE_ERRORS).absolute(0);
    counter!(SESSIONS_STARTED).absolute(0);
    counter!(WATCHLIST_REFRESHES).absolute(0);
    counter!(WATCHLIST_PERSIST_ERRORS).absolute(0);
}
