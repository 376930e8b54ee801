//! Known-label universe.
//!
//! The universe comes from the classifier's `metadata.json` and is fixed for the
//! lifetime of a session. Order matters: it is the canonical order used when
//! listing absentees.

use std::{borrow::Borrow, collections::HashMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// Identifier of one person the model can recognise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClassLabel {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ClassLabel {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Subset of a Teachable Machine style `metadata.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelMetadata {
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct KnownLabels {
    labels: Vec<ClassLabel>,
    positions: HashMap<ClassLabel, usize>,
}

impl KnownLabels {
    pub fn new<I, L>(labels: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = L>,
        L: Into<ClassLabel>,
    {
        let mut ordered = Vec::new();
        let mut positions = HashMap::new();

        for label in labels {
            let label = label.into();
            if positions.contains_key(&label) {
                return Err(RosterError::DuplicateLabel(label.to_string()));
            }
            positions.insert(label.clone(), ordered.len());
            ordered.push(label);
        }

        if ordered.is_empty() {
            return Err(RosterError::EmptyUniverse);
        }

        Ok(Self {
            labels: ordered,
            positions,
        })
    }

    pub fn from_metadata(metadata: LabelMetadata) -> Result<Self, RosterError> {
        Self::new(metadata.labels)
    }

    pub fn from_metadata_json(raw: &str) -> Result<Self> {
        let metadata: LabelMetadata =
            serde_json::from_str(raw).context("failed to parse model metadata")?;
        Ok(Self::from_metadata(metadata)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read model metadata {}", path.display()))?;
        Self::from_metadata_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Returns the canonical label instance for `name`, if known.
    pub fn resolve(&self, name: &str) -> Option<&ClassLabel> {
        self.positions.get(name).map(|&idx| &self.labels[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLabel> {
        self.labels.iter()
    }

    pub fn as_slice(&self) -> &[ClassLabel] {
        &self.labels
    }
}
