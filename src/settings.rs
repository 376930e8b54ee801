use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::{
    export::{RetryPolicy, DEFAULT_COLLECTION},
    roster::ThresholdPolicy,
    sensing::LoopConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceSettings {
    pub threshold: ThresholdPolicy,
    pub tick_interval_ms: u64,
    pub inference_timeout_ms: u64,
    pub export_dir: PathBuf,
    pub collection: String,
    /// Account used for remote saves; `None` means signed out.
    pub signed_in_user: Option<String>,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            threshold: ThresholdPolicy::default(),
            tick_interval_ms: 100,
            inference_timeout_ms: 2_000,
            export_dir: PathBuf::from("exports"),
            collection: DEFAULT_COLLECTION.into(),
            signed_in_user: None,
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl AttendanceSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold.value) {
            bail!("threshold {} must be within [0, 1]", self.threshold.value);
        }
        if self.tick_interval_ms == 0 {
            bail!("tick interval must be greater than zero");
        }
        if self.collection.trim().is_empty() {
            bail!("collection name must not be empty");
        }
        Ok(())
    }

    pub fn loop_config(&self, verbose_frames: bool) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            inference_timeout: Duration::from_millis(self.inference_timeout_ms),
            verbose_frames,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Missing or unparsable files yield defaults; values that parse but fail
/// validation are an error.
fn read_settings(path: &Path) -> Result<AttendanceSettings> {
    if !path.exists() {
        return Ok(AttendanceSettings::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let data: AttendanceSettings = serde_json::from_str(&contents).unwrap_or_else(|err| {
        log::warn!("Ignoring unreadable settings {}: {err}", path.display());
        AttendanceSettings::default()
    });
    data.validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(data)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AttendanceSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = read_settings(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> AttendanceSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: AttendanceSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let data = read_settings(&self.path)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &AttendanceSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AttendanceSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AttendanceSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::ThresholdMode;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get(), AttendanceSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.get();
        settings.threshold = ThresholdPolicy::new(0.8, ThresholdMode::Rounded);
        settings.signed_in_user = Some("teacher".into());
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.get(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "tickIntervalMs": 250 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().get();
        assert_eq!(settings.tick_interval_ms, 250);
        assert_eq!(settings.threshold, ThresholdPolicy::default());
    }

    #[test]
    fn nested_partial_threshold_loads_the_same_on_open_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "threshold": { "value": 0.8 } }"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        let opened = store.get();
        assert_eq!(opened.threshold, ThresholdPolicy::new(0.8, ThresholdMode::Strict));

        fs::write(&path, r#"{ "threshold": { "mode": "rounded" }, "tickIntervalMs": 50 }"#)
            .unwrap();
        store.reload().unwrap();
        let reloaded = store.get();
        assert_eq!(reloaded.threshold, ThresholdPolicy::new(0.9, ThresholdMode::Rounded));
        assert_eq!(reloaded.tick_interval_ms, 50);
    }

    #[test]
    fn unreadable_file_falls_back_on_open_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.get(), AttendanceSettings::default());

        let mut custom = store.get();
        custom.tick_interval_ms = 250;
        store.update(custom).unwrap();
        fs::write(&path, "{ not json").unwrap();
        store.reload().unwrap();
        assert_eq!(store.get(), AttendanceSettings::default());
    }

    #[test]
    fn invalid_values_fail_on_open_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        fs::write(&path, r#"{ "tickIntervalMs": 0 }"#).unwrap();
        assert!(SettingsStore::new(path).is_err());
        assert!(store.reload().is_err());
        assert_eq!(store.get(), AttendanceSettings::default());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let mut settings = store.get();
        settings.threshold.value = 1.5;
        assert!(store.update(settings).is_err());
    }
}
