//! Retrieval-augmented diagnostic pipeline: keyword intent classification,
//! Qdrant MMR retrieval, context assembly, and clinical-style generation.

mod analyzer;
mod context;
mod intent;
mod store;

pub use analyzer::DiagnosticAnalyzer;
pub use context::build_medical_context;
pub use intent::KeywordClassifier;
pub use store::{VectorStore, DEFAULT_SOURCE};
