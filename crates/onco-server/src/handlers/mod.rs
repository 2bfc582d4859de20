pub mod chat;
pub mod login;
pub mod predict;
pub mod upload;

use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
