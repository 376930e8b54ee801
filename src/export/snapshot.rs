use chrono::{DateTime, Utc};

use crate::{
    models::AttendanceSnapshot,
    roster::RosterTracker,
    utils::time::{iso_date, iso_instant},
};

/// Freezes the roster at `at`. Pure: same roster and instant, same snapshot.
pub fn build_snapshot(roster: &RosterTracker, at: DateTime<Utc>) -> AttendanceSnapshot {
    AttendanceSnapshot::new(
        roster.present_list(),
        roster.absent_list(),
        iso_date(at),
        iso_instant(at),
    )
}
