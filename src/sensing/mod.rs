pub mod capture;
pub mod controller;
pub mod inference;
pub mod loop_worker;

pub use capture::{Frame, FrameSource, ImageFileSource};
pub use controller::SensingController;
pub use inference::{frame_records, Classifier};
pub use loop_worker::LoopConfig;
