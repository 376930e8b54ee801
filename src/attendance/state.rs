use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::{
    models::{ClassLabel, KnownLabels, PredictionRecord, SessionInfo, SessionStatus},
    roster::{RosterTracker, ThresholdPolicy},
    session_log::SessionLog,
};

/// What one applied frame changed, kept so a UI can show the latest reading
/// without touching roster internals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutcome {
    pub observed_at: DateTime<Utc>,
    pub best: Option<PredictionRecord>,
    /// Best score cleared the threshold.
    pub confident: bool,
    pub admitted: Vec<ClassLabel>,
}

/// Everything a session mutates. Only the prediction loop and the session
/// controller write to it; everyone else reads through the accessors.
#[derive(Debug, Clone)]
pub struct AttendanceState {
    pub(crate) session_id: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) stopped_at: Option<DateTime<Utc>>,
    pub(crate) roster: RosterTracker,
    pub(crate) log: SessionLog,
    pub(crate) frames_applied: u64,
    pub(crate) frames_skipped: u64,
    pub(crate) latest: Option<FrameOutcome>,
}

impl AttendanceState {
    pub fn new(known: Arc<KnownLabels>, policy: ThresholdPolicy) -> Self {
        Self {
            session_id: None,
            status: SessionStatus::Idle,
            started_at: None,
            stopped_at: None,
            roster: RosterTracker::new(known, policy),
            log: SessionLog::new(),
            frames_applied: 0,
            frames_skipped: 0,
            latest: None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn roster(&self) -> &RosterTracker {
        &self.roster
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn latest(&self) -> Option<&FrameOutcome> {
        self.latest.as_ref()
    }

    /// Fresh roster and log for a new session.
    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>) {
        self.clear_data();
        self.session_id = Some(session_id);
        self.status = SessionStatus::Running;
        self.started_at = Some(started_at);
        self.stopped_at = None;
    }

    /// Ends the session but keeps its data readable for a final export.
    pub fn stop(&mut self, stopped_at: DateTime<Utc>) {
        self.status = SessionStatus::Stopped;
        self.stopped_at = Some(stopped_at);
    }

    /// Clears roster, log and counters. A stopped session is torn down to idle;
    /// a running one keeps running on the cleared state.
    pub fn reset(&mut self) {
        self.clear_data();
        if self.status == SessionStatus::Stopped {
            self.session_id = None;
            self.status = SessionStatus::Idle;
            self.started_at = None;
            self.stopped_at = None;
        }
    }

    fn clear_data(&mut self) {
        self.roster.reset();
        self.log.clear();
        self.frames_applied = 0;
        self.frames_skipped = 0;
        self.latest = None;
    }

    /// Logs every record, then offers it to the roster.
    pub fn apply_frame(&mut self, records: &[PredictionRecord]) -> FrameOutcome {
        let mut admitted = Vec::new();

        for record in records {
            self.log
                .record(record.label.clone(), record.probability, record.observed_at);

            match self.roster.observe(record) {
                Ok(true) => admitted.push(record.label.clone()),
                Ok(false) => {}
                Err(err) => warn!("prediction skipped by roster: {err}"),
            }
        }

        let best = records
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
            .cloned();
        let confident = best
            .as_ref()
            .is_some_and(|record| self.roster.policy().accepts(record.probability));
        let observed_at = records
            .first()
            .map(|record| record.observed_at)
            .unwrap_or_else(Utc::now);

        let outcome = FrameOutcome {
            observed_at,
            best,
            confident,
            admitted,
        };

        self.frames_applied += 1;
        self.latest = Some(outcome.clone());
        outcome
    }

    pub fn record_skip(&mut self) {
        self.frames_skipped += 1;
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.session_id.clone(),
            status: self.status,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            frames_applied: self.frames_applied,
            frames_skipped: self.frames_skipped,
            present_count: self.roster.present_count(),
            absent_count: self.roster.absent_count(),
            log_entries: self.log.count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AttendanceState {
        let known = KnownLabels::new(["Shifu", "WallE", "Mantis", "Po"]).unwrap();
        AttendanceState::new(Arc::new(known), ThresholdPolicy::default())
    }

    fn frame(scores: [f64; 4]) -> Vec<PredictionRecord> {
        let at = Utc::now();
        ["Shifu", "WallE", "Mantis", "Po"]
            .into_iter()
            .zip(scores)
            .map(|(label, p)| PredictionRecord::new(label, p, at))
            .collect()
    }

    #[test]
    fn every_prediction_is_logged_but_only_confident_ones_admitted() {
        let mut state = state();
        state.begin_session("s1".into(), Utc::now());

        let outcome = state.apply_frame(&frame([0.95, 0.10, 0.30, 0.05]));

        assert_eq!(state.log.count(), 4);
        assert_eq!(outcome.admitted, vec![ClassLabel::new("Shifu")]);
        assert!(outcome.confident);
        assert_eq!(outcome.best.unwrap().label.as_str(), "Shifu");
    }

    #[test]
    fn unsure_frame_is_not_confident() {
        let mut state = state();
        let outcome = state.apply_frame(&frame([0.4, 0.3, 0.2, 0.1]));
        assert!(!outcome.confident);
        assert!(outcome.admitted.is_empty());
        assert_eq!(state.frames_applied, 1);
    }

    #[test]
    fn stop_keeps_data_and_reset_tears_down() {
        let mut state = state();
        state.begin_session("s1".into(), Utc::now());
        state.apply_frame(&frame([0.1, 0.99, 0.1, 0.1]));
        state.stop(Utc::now());

        assert_eq!(state.status, SessionStatus::Stopped);
        assert_eq!(state.roster.present_count(), 1);
        assert_eq!(state.log.count(), 4);

        state.reset();
        let info = state.info();
        assert_eq!(info.status, SessionStatus::Idle);
        assert_eq!(info.id, None);
        assert_eq!(info.log_entries, 0);
        assert_eq!(info.absent_count, 4);
    }

    #[test]
    fn accessors_mirror_applied_frames() {
        let mut state = state();
        assert_eq!(state.status(), SessionStatus::Idle);
        assert!(state.latest().is_none());

        state.begin_session("s2".into(), Utc::now());
        state.apply_frame(&frame([0.2, 0.1, 0.97, 0.1]));

        assert_eq!(state.session_id(), Some("s2"));
        assert_eq!(state.status(), SessionStatus::Running);
        assert!(state.roster().is_present("Mantis"));
        assert_eq!(state.log().count(), 4);
        assert_eq!(state.latest().unwrap().admitted, vec![ClassLabel::new("Mantis")]);
    }

    #[test]
    fn reset_while_running_keeps_session() {
        let mut state = state();
        state.begin_session("s1".into(), Utc::now());
        state.apply_frame(&frame([0.99, 0.99, 0.1, 0.1]));

        state.reset();

        assert_eq!(state.status, SessionStatus::Running);
        assert_eq!(state.session_id.as_deref(), Some("s1"));
        assert_eq!(state.roster.present_count(), 0);
    }
}
