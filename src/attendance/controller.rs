use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::info;
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    db::Database,
    error::{ExportError, PersistError},
    export::{
        build_snapshot, log_artifact, snapshot_artifact, write_artifact, DocumentId,
        DocumentStore, RemotePersister, RetryPolicy,
    },
    models::{AttendanceSnapshot, ClassLabel, KnownLabels, SessionInfo, SessionStatus},
    sensing::{Classifier, FrameSource, LoopConfig, SensingController},
    session_log::LogFormat,
    settings::AttendanceSettings,
};

use super::{AttendanceState, FrameOutcome};

/// Session lifecycle and the public operations a UI maps its buttons onto.
pub struct AttendanceController<S: DocumentStore = Database> {
    known: Arc<KnownLabels>,
    state: Arc<Mutex<AttendanceState>>,
    sensing: Arc<Mutex<SensingController>>,
    persister: RemotePersister<S>,
    loop_config: LoopConfig,
    retry: RetryPolicy,
    export_dir: PathBuf,
}

impl<S: DocumentStore> Clone for AttendanceController<S> {
    fn clone(&self) -> Self {
        Self {
            known: Arc::clone(&self.known),
            state: Arc::clone(&self.state),
            sensing: Arc::clone(&self.sensing),
            persister: self.persister.clone(),
            loop_config: self.loop_config,
            retry: self.retry,
            export_dir: self.export_dir.clone(),
        }
    }
}

impl<S: DocumentStore> AttendanceController<S> {
    pub fn new(
        known: KnownLabels,
        settings: &AttendanceSettings,
        persister: RemotePersister<S>,
    ) -> Self {
        let debug_mode = std::env::var("ATTENDANCE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let known = Arc::new(known);
        Self {
            state: Arc::new(Mutex::new(AttendanceState::new(
                Arc::clone(&known),
                settings.threshold,
            ))),
            known,
            sensing: Arc::new(Mutex::new(SensingController::new())),
            persister,
            loop_config: settings.loop_config(debug_mode),
            retry: settings.retry_policy(),
            export_dir: settings.export_dir.clone(),
        }
    }

    pub fn known_labels(&self) -> &KnownLabels {
        &self.known
    }

    pub async fn start_session(
        &self,
        source: Box<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<SessionInfo> {
        let mut sensing = self.sensing.lock().await;
        {
            let state = self.state.lock().await;
            if state.status() == SessionStatus::Running {
                return Err(anyhow!("attendance session already running"));
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        // state must be armed before the first tick can fire
        self.state
            .lock()
            .await
            .begin_session(session_id.clone(), started_at);

        if let Err(err) = sensing.start_sensing(
            source,
            classifier,
            Arc::clone(&self.known),
            Arc::clone(&self.state),
            self.loop_config,
        ) {
            self.state.lock().await.stop(Utc::now());
            return Err(err);
        }

        info!(
            "attendance session {session_id} started with {} known labels",
            self.known.len()
        );
        Ok(self.session_info().await)
    }

    /// Halts the loop. Roster and log stay readable until `reset`.
    pub async fn stop_session(&self) -> Result<SessionInfo> {
        let mut sensing = self.sensing.lock().await;
        {
            let state = self.state.lock().await;
            if state.status() != SessionStatus::Running {
                return Err(anyhow!("no running attendance session to stop"));
            }
        }

        sensing.stop_sensing().await?;

        let info = {
            let mut state = self.state.lock().await;
            state.stop(Utc::now());
            state.info()
        };

        info!(
            "attendance session {} stopped: {} present, {} absent, {} log entries",
            info.id.as_deref().unwrap_or("?"),
            info.present_count,
            info.absent_count,
            info.log_entries
        );
        Ok(info)
    }

    pub async fn reset(&self) -> SessionInfo {
        let mut state = self.state.lock().await;
        state.reset();
        info!("attendance state reset");
        state.info()
    }

    pub async fn session_info(&self) -> SessionInfo {
        self.state.lock().await.info()
    }

    pub async fn present_list(&self) -> Vec<ClassLabel> {
        self.state.lock().await.roster().present_list()
    }

    pub async fn absent_list(&self) -> Vec<ClassLabel> {
        self.state.lock().await.roster().absent_list()
    }

    pub async fn log_count(&self) -> usize {
        self.state.lock().await.log().count()
    }

    pub async fn latest_outcome(&self) -> Option<FrameOutcome> {
        self.state.lock().await.latest().cloned()
    }

    pub async fn snapshot_at(&self, at: DateTime<Utc>) -> AttendanceSnapshot {
        build_snapshot(self.state.lock().await.roster(), at)
    }

    pub async fn export_snapshot(&self) -> Result<PathBuf, ExportError> {
        let snapshot = self.snapshot_at(Utc::now()).await;
        let artifact = snapshot_artifact(&snapshot)?;
        let path = write_artifact(&self.export_dir, &artifact)?;
        info!("roster exported to {}", path.display());
        Ok(path)
    }

    pub async fn export_log(&self, format: LogFormat) -> Result<PathBuf, ExportError> {
        let artifact = {
            let state = self.state.lock().await;
            log_artifact(state.log(), format, Utc::now())?
        };
        let path = write_artifact(&self.export_dir, &artifact)?;
        info!("session log exported to {}", path.display());
        Ok(path)
    }

    /// Saves the current roster without blocking the caller; await the handle
    /// for the outcome.
    pub async fn persist_snapshot(&self) -> JoinHandle<Result<DocumentId, PersistError>> {
        let snapshot = self.snapshot_at(Utc::now()).await;
        self.persister.spawn_persist(snapshot, self.retry)
    }
}
