pub mod backend;
pub mod diff;
pub mod router;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, WatchlistBackend};
pub use diff::{compute_trend, entry_trend, Delta, Direction, Trend, DELTA_EPSILON};
pub use router::PinnedResultRouter;
pub use store::{Watchlist, WatchlistStore};
