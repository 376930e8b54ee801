use serde::{Deserialize, Serialize};

use super::ClassLabel;

/// Point-in-time export of the roster.
///
/// Built by `export::build_snapshot`; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSnapshot {
    present: Vec<ClassLabel>,
    absent: Vec<ClassLabel>,
    date: String,
    timestamp: String,
}

impl AttendanceSnapshot {
    pub(crate) fn new(
        present: Vec<ClassLabel>,
        absent: Vec<ClassLabel>,
        date: String,
        timestamp: String,
    ) -> Self {
        Self {
            present,
            absent,
            date,
            timestamp,
        }
    }

    pub fn present(&self) -> &[ClassLabel] {
        &self.present
    }

    pub fn absent(&self) -> &[ClassLabel] {
        &self.absent
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Document-store key. Same snapshot, same key.
    pub fn key(&self) -> &str {
        &self.timestamp
    }
}
