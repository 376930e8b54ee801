use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{
    error::InferenceError,
    models::{KnownLabels, PredictionRecord, RawPrediction},
};

use super::Frame;

/// Image classifier. Each call is independent of earlier ones.
pub trait Classifier: Send + Sync {
    fn predict(&self, frame: &Frame) -> Result<Vec<RawPrediction>, InferenceError>;
}

/// Checks a classifier answer against the known universe and stamps it.
///
/// A usable frame has exactly one finite probability in `[0, 1]` for every
/// known label and nothing else.
pub fn frame_records(
    known: &KnownLabels,
    predictions: Vec<RawPrediction>,
    observed_at: DateTime<Utc>,
) -> Result<Vec<PredictionRecord>, InferenceError> {
    if predictions.len() != known.len() {
        return Err(InferenceError::Malformed(format!(
            "expected {} predictions, got {}",
            known.len(),
            predictions.len()
        )));
    }

    let mut seen = HashSet::with_capacity(predictions.len());
    let mut records = Vec::with_capacity(predictions.len());

    for prediction in predictions {
        let Some(label) = known.resolve(&prediction.class_name) else {
            return Err(InferenceError::Malformed(format!(
                "unknown class '{}'",
                prediction.class_name
            )));
        };
        if !seen.insert(label.clone()) {
            return Err(InferenceError::Malformed(format!(
                "class '{label}' reported twice"
            )));
        }
        if !(0.0..=1.0).contains(&prediction.probability) {
            return Err(InferenceError::Malformed(format!(
                "probability {} for '{label}' is outside [0, 1]",
                prediction.probability
            )));
        }

        records.push(PredictionRecord::new(
            label.clone(),
            prediction.probability,
            observed_at,
        ));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> KnownLabels {
        KnownLabels::new(["Shifu", "Po"]).unwrap()
    }

    #[test]
    fn accepts_complete_frame() {
        let records = frame_records(
            &known(),
            vec![RawPrediction::new("Po", 0.7), RawPrediction::new("Shifu", 0.3)],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label.as_str(), "Po");
    }

    #[test]
    fn rejects_partial_unknown_or_out_of_range() {
        let now = Utc::now();
        let cases = [
            vec![RawPrediction::new("Po", 0.7)],
            vec![RawPrediction::new("Po", 0.7), RawPrediction::new("Tai Lung", 0.3)],
            vec![RawPrediction::new("Po", 0.7), RawPrediction::new("Po", 0.3)],
            vec![RawPrediction::new("Po", 1.2), RawPrediction::new("Shifu", 0.3)],
            vec![RawPrediction::new("Po", f64::NAN), RawPrediction::new("Shifu", 0.3)],
        ];

        for case in cases {
            let err = frame_records(&known(), case, now).unwrap_err();
            assert!(matches!(err, InferenceError::Malformed(_)));
        }
    }
}
