pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod query;
pub mod report;
pub mod scanner;
pub mod session;
pub mod stream;
pub mod watchlist;

pub use scanner::Scanner;
