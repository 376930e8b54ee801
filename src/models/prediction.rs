use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ClassLabel;

/// One class score exactly as the classifier reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrediction {
    pub class_name: String,
    pub probability: f64,
}

impl RawPrediction {
    pub fn new(class_name: impl Into<String>, probability: f64) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// One inference outcome for one known label on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub label: ClassLabel,
    pub probability: f64,
    pub observed_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(label: impl Into<ClassLabel>, probability: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            label: label.into(),
            probability,
            observed_at,
        }
    }
}
