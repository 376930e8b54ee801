//! Append-only record of every prediction the loop observed.
//!
//! Unlike the roster, the log is threshold-independent: a 0.05 score is logged
//! just like a 0.99 one.

pub mod format;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::LogError, models::ClassLabel};

pub use format::{parse_csv, LogFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub label: ClassLabel,
    pub probability: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: ClassLabel, probability: f64, at: DateTime<Utc>) {
        self.entries.push(LogEntry {
            timestamp: at,
            label,
            probability,
        });
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn serialize(&self, format: LogFormat) -> Result<Vec<u8>, LogError> {
        if self.entries.is_empty() {
            return Err(LogError::EmptyLog);
        }
        Ok(format::render(&self.entries, format).into_bytes())
    }
}
