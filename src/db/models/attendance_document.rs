//! A saved roster as read back from the document table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AttendanceSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAttendance {
    pub collection: String,
    pub snapshot: AttendanceSnapshot,
    pub saved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
