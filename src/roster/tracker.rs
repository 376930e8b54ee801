use std::{collections::HashSet, sync::Arc};

use crate::{
    error::RosterError,
    models::{ClassLabel, KnownLabels, PredictionRecord},
};

use super::ThresholdPolicy;

/// Present/absent partition of the known-label universe.
///
/// `present` only grows until `reset`; `absent` is never stored and is always
/// computed as the known labels minus `present`.
#[derive(Debug, Clone)]
pub struct RosterTracker {
    known: Arc<KnownLabels>,
    policy: ThresholdPolicy,
    present: Vec<ClassLabel>,
    present_set: HashSet<ClassLabel>,
}

impl RosterTracker {
    pub fn new(known: Arc<KnownLabels>, policy: ThresholdPolicy) -> Self {
        Self {
            known,
            policy,
            present: Vec::new(),
            present_set: HashSet::new(),
        }
    }

    pub fn known(&self) -> &KnownLabels {
        &self.known
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    /// Applies one prediction. Returns `true` when the label was newly marked present.
    pub fn observe(&mut self, record: &PredictionRecord) -> Result<bool, RosterError> {
        let Some(label) = self.known.resolve(record.label.as_str()) else {
            return Err(RosterError::InvalidLabel(record.label.to_string()));
        };

        if !self.policy.accepts(record.probability) {
            return Ok(false);
        }

        if self.present_set.contains(label) {
            return Ok(false);
        }

        self.present_set.insert(label.clone());
        self.present.push(label.clone());
        Ok(true)
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.present_set.contains(label)
    }

    /// Present labels in first-observed order.
    pub fn present_list(&self) -> Vec<ClassLabel> {
        self.present.clone()
    }

    /// Known labels not yet seen, in metadata order.
    pub fn absent_list(&self) -> Vec<ClassLabel> {
        self.known
            .iter()
            .filter(|label| !self.present_set.contains(*label))
            .cloned()
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.present.len()
    }

    pub fn absent_count(&self) -> usize {
        self.known.len() - self.present.len()
    }

    pub fn reset(&mut self) {
        self.present.clear();
        self.present_set.clear();
    }
}
