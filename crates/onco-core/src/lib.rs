//! Core domain types, error definitions, and seam traits.
//!
//! This crate defines the fundamental types shared across the service:
//! errors, the retrieved-passage and report models, the authenticated user,
//! and the traits that decouple the supervisor from its two answer paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while answering a query or analyzing a report.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Failed to parse structured output: {0}")]
    Parse(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Unknown category value: {0}")]
    UnknownCategory(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Parse(err.to_string())
    }
}

/// A passage returned by the vector store, tagged with its source label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub source: String,
}

/// Lifecycle of a persisted report. Written at most twice: `Processing` on
/// insert, then exactly one terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Processing,
    Analyzed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Processing => "processing",
            ReportStatus::Analyzed => "analyzed",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Processing)
    }
}

/// Identity derived from a verified bearer token. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Result of the tabular classifier.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub prediction: String,
    pub confidence: f64,
}

/// Strategy for classifying query intent. Keyword-based today; the trait
/// keeps the supervisor's control flow untouched if a model-based classifier
/// replaces it.
pub trait IntentClassifier: Send + Sync {
    /// Returns true when the query should take the diagnostic RAG path.
    fn is_diagnostic(&self, query: &str) -> bool;
}

/// The diagnostic RAG path: retrieval plus clinical-style generation.
#[async_trait]
pub trait DiagnosticPath: Send + Sync {
    async fn analyze(&self, query: &str, vision_score: Option<f64>) -> Result<String, CoreError>;
}

/// The conversational path: the multi-agent team.
#[async_trait]
pub trait ConversationalPath: Send + Sync {
    async fn respond(&self, query: &str) -> Result<String, CoreError>;
}

/// Produces a fixed-dimension embedding for a piece of text.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CoreError>;

    /// Dimension of the vectors produced by `embed`.
    fn dim(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_status_round_trips_as_db_strings() {
        assert_eq!(ReportStatus::Processing.as_str(), "processing");
        assert_eq!(ReportStatus::Analyzed.as_str(), "analyzed");
        assert_eq!(ReportStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn only_processing_is_non_terminal() {
        assert!(!ReportStatus::Processing.is_terminal());
        assert!(ReportStatus::Analyzed.is_terminal());
        assert!(ReportStatus::Failed.is_terminal());
    }
}
