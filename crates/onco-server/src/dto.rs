//! Data transfer objects for the HTTP surface. Wire field names mirror the
//! public API contract, including the capitalized clinical field names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub vision_score: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub disclaimer: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "Diagnosis_Age")]
    pub diagnosis_age: f64,
    #[serde(rename = "Mutation_Count")]
    pub mutation_count: f64,
    #[serde(rename = "Number_of_Samples_Per_Patient")]
    pub samples_per_patient: f64,
    #[serde(rename = "TMB_nonsynonymous")]
    pub tmb_nonsynonymous: f64,
    #[serde(rename = "Sex")]
    pub sex: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub report_id: i64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}
