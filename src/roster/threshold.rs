use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdMode {
    /// `probability > value` on the raw score.
    #[default]
    Strict,
    /// Score is rounded to two decimals before the comparison.
    Rounded,
}

/// Confidence gate for admitting a label to the present roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdPolicy {
    pub value: f64,
    pub mode: ThresholdMode,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            value: 0.9,
            mode: ThresholdMode::Strict,
        }
    }
}

impl ThresholdPolicy {
    pub fn new(value: f64, mode: ThresholdMode) -> Self {
        Self { value, mode }
    }

    pub fn accepts(&self, probability: f64) -> bool {
        let score = match self.mode {
            ThresholdMode::Strict => probability,
            ThresholdMode::Rounded => (probability * 100.0).round() / 100.0,
        };
        score > self.value
    }
}
