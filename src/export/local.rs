//! Downloadable artifacts.
//!
//! Every filename carries the export instant, and `write_artifact` refuses to
//! replace a file that already exists.

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    error::ExportError,
    models::AttendanceSnapshot,
    session_log::{LogFormat, SessionLog},
    utils::time::file_stamp,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn snapshot_artifact(snapshot: &AttendanceSnapshot) -> Result<FileArtifact, ExportError> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    // the snapshot timestamp is already RFC 3339; only the separators change
    let stamp = snapshot.timestamp().replace([':', '.'], "-");

    Ok(FileArtifact {
        file_name: format!("attendance_roster_{stamp}.json"),
        mime_type: "application/json",
        bytes,
    })
}

pub fn log_artifact(
    log: &SessionLog,
    format: LogFormat,
    at: DateTime<Utc>,
) -> Result<FileArtifact, ExportError> {
    let bytes = log.serialize(format)?;
    let prefix = match format {
        LogFormat::Csv => "attendance_data",
        LogFormat::PlainText => "attendance_notes",
    };

    Ok(FileArtifact {
        file_name: format!("{prefix}_{}.{}", file_stamp(at), format.extension()),
        mime_type: format.mime_type(),
        bytes,
    })
}

pub fn write_artifact(dir: &Path, artifact: &FileArtifact) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(ExportError::AlreadyExists(path));
        }
        Err(err) => return Err(err.into()),
    };

    file.write_all(&artifact.bytes)?;
    file.sync_all()?;
    Ok(path)
}
