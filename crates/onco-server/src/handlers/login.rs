//! `/login`: password-grant delegation to the managed auth backend.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::dto::{LoginRequest, LoginResponse};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
struct TokenGrantResponse {
    access_token: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state
        .http
        .post(state.settings.auth.token_url())
        .header("apikey", &state.settings.auth.anon_key)
        .json(&serde_json::json!({
            "email": request.email,
            "password": request.password,
        }))
        .send()
        .await
        .map_err(|e| {
            debug!("Auth backend unreachable: {}", e);
            AppError::Unauthorized
        })?;

    if !response.status().is_success() {
        return Err(AppError::Unauthorized);
    }

    let grant: TokenGrantResponse = response.json().await.map_err(|e| {
        debug!("Auth backend response malformed: {}", e);
        AppError::Unauthorized
    })?;

    Ok(Json(LoginResponse { access_token: grant.access_token }))
}
