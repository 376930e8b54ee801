pub mod attendance;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod roster;
pub mod sensing;
pub mod session_log;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod testing;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use attendance::{AttendanceController, AttendanceState, FrameOutcome};
pub use db::Database;
pub use error::{
    CaptureError, ExportError, InferenceError, LogError, PersistError, RosterError, TickError,
};
pub use export::{DocumentId, DocumentStore, RemotePersister, RetryPolicy, StaticAuth};
pub use models::{
    AttendanceSnapshot, ClassLabel, KnownLabels, PredictionRecord, RawPrediction, SessionInfo,
    SessionStatus,
};
pub use roster::{RosterTracker, ThresholdMode, ThresholdPolicy};
pub use sensing::{Classifier, Frame, FrameSource, ImageFileSource};
pub use session_log::{LogFormat, SessionLog};
pub use settings::{AttendanceSettings, SettingsStore};

pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub attendance: AttendanceController<Database>,
}

/// Opens (or creates) everything under `app_data_dir` and wires the controller
/// to the labels listed in the model's `metadata.json`.
pub fn setup(app_data_dir: &Path, metadata_path: &Path) -> Result<AppState> {
    utils::logging::init_logging();

    std::fs::create_dir_all(app_data_dir).with_context(|| {
        format!("failed to create data directory {}", app_data_dir.display())
    })?;

    let database = Database::new(app_data_dir.join("attendance.sqlite3"))?;
    let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
    let mut settings = settings_store.get();
    if settings.export_dir.is_relative() {
        settings.export_dir = app_data_dir.join(&settings.export_dir);
    }

    let known = KnownLabels::load(metadata_path)?;
    log::info!(
        "loaded {} labels from {}",
        known.len(),
        metadata_path.display()
    );

    let persister = RemotePersister::new(
        Arc::new(database.clone()),
        Arc::new(StaticAuth(settings.signed_in_user.clone())),
        settings.collection.clone(),
    );
    let attendance = AttendanceController::new(known, &settings, persister);

    Ok(AppState {
        db: database,
        settings: settings_store,
        attendance,
    })
}
