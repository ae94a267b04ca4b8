pub mod result;
pub mod watchlist;

pub use result::{FlaggedSide, HolderRecord, ResultPayload, SideAnalysis};
pub use watchlist::{HistorySnapshot, WatchlistEntry, HISTORY_CAP};
