pub mod threshold;
pub mod tracker;

pub use threshold::{ThresholdMode, ThresholdPolicy};
pub use tracker::RosterTracker;
