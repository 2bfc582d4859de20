//! Local model inference: summarization, query embeddings, multimodal
//! vision, the tabular classifier, and PDF text extraction.

mod embedder;
mod extract;
mod summarizer;
mod tabular;
mod vision;

pub use embedder::{MiniLmEmbedder, EMBEDDING_DIM};
pub use extract::{extract_pdf_text, extract_pdf_text_from_bytes};
pub use summarizer::{prepare_input, Summarizer, SummarizeInput, TOO_SHORT_MESSAGE};
pub use tabular::{ClinicalFeatures, TabularPredictor};
pub use vision::{ImageSource, VisionClient, TRANSCRIBE_INSTRUCTION};
