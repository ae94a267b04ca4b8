pub mod accumulator;
pub mod controller;
pub mod observer;

pub use accumulator::{AccumulatorSnapshot, ResultAccumulator};
pub use controller::{SessionController, SessionStatus};
pub use observer::{SessionId, SessionObserver, SessionState, Termination};
