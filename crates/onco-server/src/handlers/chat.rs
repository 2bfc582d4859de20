//! `/chat`: supervisor-routed answers, optionally combined with vision
//! analysis when an image is supplied.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use onco_inference::ImageSource;
use tracing::warn;

use crate::auth::{CurrentUser, TEST_USER_ID};
use crate::db;
use crate::dto::{ChatRequest, ChatResponse};
use crate::error::AppError;
use crate::state::AppState;

pub const DISCLAIMER: &str = "This system provides AI-assisted risk analysis and is not a substitute for professional medical diagnosis.";

fn wants_vision(request: &ChatRequest) -> bool {
    request.image_url.is_some() || request.query.to_lowercase().contains("medgemma")
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let supervisor_answer = state.supervisor.run(&request.query, request.vision_score).await?;

    let response = if wants_vision(&request) {
        let image = request.image_url.as_deref().map(ImageSource::from_reference);
        match state.vision.infer(&request.query, image.as_ref()).await {
            Ok(vision_answer) => format!(
                "**MedGemma Image Analysis:**\n{vision_answer}\n\n---\n**RAG Clinical Context:**\n{supervisor_answer}"
            ),
            Err(e) => {
                // When vision fails, the supervisor answer stands alone.
                warn!("Vision inference failed: {}", e);
                supervisor_answer
            }
        }
    } else {
        supervisor_answer
    };

    if user.id != TEST_USER_ID {
        let conn = state
            .db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))?;
        db::insert_chat(&conn, &user.id, &request.query, &response)
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }

    Ok(Json(ChatResponse { response, disclaimer: DISCLAIMER }))
}
