//! Tabular cancer-type classifier over ONNX Runtime.
//!
//! The model is an sklearn-trained classifier exported to ONNX (zipmap
//! disabled, so the probability output is a plain tensor). Categorical
//! encoding and the inverse label table are fixed at training time and
//! mirrored here.

use std::path::Path;
use std::sync::Mutex;

use onco_core::{CoreError, Prediction};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

/// Inverse target-encoder table, in the encoder's class-index order.
const CLASS_LABELS: &[&str] = &[
    "Breast Cancer",
    "Colorectal Cancer",
    "Leukemia",
    "Lung Cancer",
    "Lymphoma",
    "Prostate Cancer",
];

/// Structured clinical fields, in wire order.
#[derive(Debug, Clone)]
pub struct ClinicalFeatures {
    pub diagnosis_age: f64,
    pub mutation_count: f64,
    pub samples_per_patient: f64,
    pub tmb_nonsynonymous: f64,
    pub sex: String,
}

/// Fixed categorical encoder for the `Sex` feature. Values outside the
/// trained vocabulary are rejected rather than bucketed.
fn encode_sex(sex: &str) -> Result<f32, CoreError> {
    match sex {
        "Female" => Ok(0.0),
        "Male" => Ok(1.0),
        other => Err(CoreError::UnknownCategory(format!(
            "Sex value {other:?} is outside the trained vocabulary (expected \"Female\" or \"Male\")"
        ))),
    }
}

/// Argmax over the probability row: class label plus confidence percentage
/// rounded to two decimals.
fn decode_probabilities(probabilities: &[f32]) -> Result<Prediction, CoreError> {
    if probabilities.is_empty() || probabilities.len() > CLASS_LABELS.len() {
        return Err(CoreError::Inference(format!(
            "classifier produced {} probabilities for {} known labels",
            probabilities.len(),
            CLASS_LABELS.len()
        )));
    }

    let (best_idx, best_prob) = probabilities
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(bi, bp), (i, &p)| {
            if p > bp { (i, p) } else { (bi, bp) }
        });

    let confidence = (f64::from(best_prob) * 100.0 * 100.0).round() / 100.0;

    Ok(Prediction {
        prediction: CLASS_LABELS[best_idx].to_string(),
        confidence,
    })
}

pub struct TabularPredictor {
    session: Mutex<Session>,
}

impl TabularPredictor {
    pub fn load(model_path: &Path) -> Result<Self, CoreError> {
        if !model_path.exists() {
            return Err(CoreError::Inference(format!(
                "classifier model not found at {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| CoreError::Inference(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| CoreError::Inference(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| CoreError::Inference(format!("ONNX load failed: {e}")))?;

        info!("Tabular classifier loaded from {}", model_path.display());

        Ok(Self { session: Mutex::new(session) })
    }

    pub fn predict(&self, features: &ClinicalFeatures) -> Result<Prediction, CoreError> {
        let sex_encoded = encode_sex(&features.sex)?;

        // Feature order fixed at training time.
        let row: Vec<f32> = vec![
            features.diagnosis_age as f32,
            features.mutation_count as f32,
            sex_encoded,
            features.tmb_nonsynonymous as f32,
            features.samples_per_patient as f32,
        ];

        let input = ndarray::Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| CoreError::Inference(e.to_string()))?;
        let input_tensor = TensorRef::from_array_view(&input)
            .map_err(|e: ort::Error| CoreError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| CoreError::Inference("classifier session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| CoreError::Inference(format!("ONNX inference failed: {e}")))?;

        // sklearn exports two outputs: label tensor first, probabilities last.
        let (_, probabilities) = outputs[outputs.len() - 1]
            .try_extract_tensor::<f32>()
            .map_err(|e| CoreError::Inference(format!("probability extraction failed: {e}")))?;

        decode_probabilities(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_encoding_matches_the_trained_vocabulary() {
        assert_eq!(encode_sex("Female").unwrap(), 0.0);
        assert_eq!(encode_sex("Male").unwrap(), 1.0);
    }

    #[test]
    fn unseen_sex_value_is_rejected() {
        let err = encode_sex("male").unwrap_err();
        assert!(matches!(err, CoreError::UnknownCategory(_)));
    }

    #[test]
    fn decoding_picks_the_argmax_label_and_rounds_confidence() {
        let prediction = decode_probabilities(&[0.05, 0.1, 0.0, 0.73456, 0.1, 0.01546]).unwrap();
        assert_eq!(prediction.prediction, "Lung Cancer");
        assert_eq!(prediction.confidence, 73.46);
        assert!((0.0..=100.0).contains(&prediction.confidence));
    }

    #[test]
    fn decoded_label_comes_from_the_fixed_label_set() {
        let prediction = decode_probabilities(&[0.5, 0.5]).unwrap();
        assert!(CLASS_LABELS.contains(&prediction.prediction.as_str()));
    }

    #[test]
    fn probability_row_wider_than_label_table_is_an_error() {
        let too_many = vec![0.1f32; CLASS_LABELS.len() + 1];
        assert!(decode_probabilities(&too_many).is_err());
        assert!(decode_probabilities(&[]).is_err());
    }
}
