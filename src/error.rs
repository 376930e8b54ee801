//! Error taxonomy for the attendance core.
//!
//! The roster tracker and session log only ever surface `RosterError` and
//! `LogError`. Collaborator failures (camera, classifier, document store) are
//! converted into `CaptureError`, `InferenceError` and `PersistError` at the
//! boundary where they are called.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("label '{0}' is not part of the known roster")]
    InvalidLabel(String),
    #[error("label '{0}' appears more than once in the model metadata")]
    DuplicateLabel(String),
    #[error("model metadata lists no labels")]
    EmptyUniverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("session log is empty, nothing to export")]
    EmptyLog,
    #[error("malformed log row {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("session log is empty, nothing to export")]
    EmptyLog,
    #[error("refusing to overwrite existing export {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<LogError> for ExportError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::EmptyLog => ExportError::EmptyLog,
            LogError::Malformed { line, reason } => ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("row {line}: {reason}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("not signed in to the document store")]
    Unauthenticated,
    #[error("document store unreachable: {0}")]
    Unreachable(String),
    #[error("document store rejected the write: {0}")]
    Rejected(String),
}

impl PersistError {
    /// Only connectivity failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Unreachable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("frame source has not been started")]
    NotStarted,
    #[error("no frame available: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("classifier failed: {0}")]
    Failed(String),
    #[error("classifier returned a malformed frame: {0}")]
    Malformed(String),
    #[error("no prediction within {0} ms")]
    TimedOut(u64),
    #[error("previous inference is still running")]
    Busy,
}

/// Why a prediction tick produced no roster update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_is_retryable() {
        assert!(PersistError::Unreachable("offline".into()).is_retryable());
        assert!(!PersistError::Unauthenticated.is_retryable());
        assert!(!PersistError::Rejected("schema".into()).is_retryable());
    }

    #[test]
    fn empty_log_maps_to_export_empty_log() {
        let err: ExportError = LogError::EmptyLog.into();
        assert!(matches!(err, ExportError::EmptyLog));
    }
}
