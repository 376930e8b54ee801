mod controller;
mod state;

pub use controller::AttendanceController;
pub use state::{AttendanceState, FrameOutcome};
