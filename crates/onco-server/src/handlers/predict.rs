//! `/predict`: tabular cancer-type classification. Unauthenticated.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use onco_core::Prediction;
use onco_inference::ClinicalFeatures;

use crate::dto::PredictRequest;
use crate::error::AppError;
use crate::state::AppState;

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Prediction>, AppError> {
    let predictor = state
        .predictor
        .as_ref()
        .ok_or_else(|| AppError::Internal("tabular classifier is not configured".into()))?;

    let features = ClinicalFeatures {
        diagnosis_age: request.diagnosis_age,
        mutation_count: request.mutation_count,
        samples_per_patient: request.samples_per_patient,
        tmb_nonsynonymous: request.tmb_nonsynonymous,
        sex: request.sex,
    };

    let prediction = predictor.predict(&features)?;
    Ok(Json(prediction))
}
