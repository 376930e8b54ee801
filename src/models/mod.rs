pub mod label;
pub mod prediction;
pub mod session;
pub mod snapshot;

pub use label::{ClassLabel, KnownLabels, LabelMetadata};
pub use prediction::{PredictionRecord, RawPrediction};
pub use session::{SessionInfo, SessionStatus};
pub use snapshot::AttendanceSnapshot;
