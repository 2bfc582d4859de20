//! Vision/text inference against an Ollama-served multimodal model.
//!
//! Used two ways: answering chat queries that carry an image, and
//! transcribing uploaded report images for the analysis pipeline.

use std::path::PathBuf;

use base64::Engine as _;
use onco_core::CoreError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fixed instruction used when transcribing an uploaded report image.
pub const TRANSCRIBE_INSTRUCTION: &str =
    "Extract all visible clinical text and values exactly as written in this report.";

/// Where the image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    LocalPath(PathBuf),
}

impl ImageSource {
    /// `http(s)` references are fetched; anything else is a local file path.
    pub fn from_reference(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            ImageSource::Url(reference.to_string())
        } else {
            ImageSource::LocalPath(PathBuf::from(reference))
        }
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn load_image(&self, source: &ImageSource) -> Result<Vec<u8>, CoreError> {
        match source {
            ImageSource::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| CoreError::ExternalApi(format!("image fetch failed: {e}")))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| CoreError::ExternalApi(format!("image fetch failed: {e}")))?;
                Ok(bytes.to_vec())
            }
            ImageSource::LocalPath(path) => tokio::fs::read(path)
                .await
                .map_err(|e| CoreError::Inference(format!("image read failed: {e}"))),
        }
    }

    /// Answers `query`, optionally grounded on an image.
    pub async fn infer(&self, query: &str, image: Option<&ImageSource>) -> Result<String, CoreError> {
        let images = match image {
            Some(source) => {
                let bytes = self.load_image(source).await?;
                Some(vec![base64::engine::general_purpose::STANDARD.encode(bytes)])
            }
            None => None,
        };

        info!(
            "Vision inference via {} (image: {})",
            self.model,
            images.is_some()
        );

        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage { role: "user", content: query.to_string(), images }],
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Inference(format!("vision request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Inference(format!(
                "vision model returned status {}",
                response.status()
            )));
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Inference(format!("vision response malformed: {e}")))?;

        Ok(body.message.content)
    }
}
