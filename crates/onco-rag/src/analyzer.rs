//! Diagnostic analyzer: retrieval-augmented clinical-style answers.

use async_trait::async_trait;
use onco_core::{CoreError, DiagnosticPath};
use onco_llm::{ChatClient, ChatOptions};
use tracing::warn;

use crate::context::build_medical_context;
use crate::store::VectorStore;

const SYSTEM_PROMPT: &str = "You are a specialist in early cancer detection and radiology.";

const NO_CONTEXT_LINE: &str = "No distinct external RAG context available for this.";

/// Decoding parameters fixed for clinical answers: long enough for a full
/// explanation, low temperature for consistency.
const ANALYZER_OPTIONS: ChatOptions = ChatOptions { max_tokens: 1000, temperature: 0.15 };

const RETRIEVAL_K: usize = 5;
const RETRIEVAL_FETCH_K: usize = 20;

pub struct DiagnosticAnalyzer {
    store: Option<VectorStore>,
    client: ChatClient,
}

impl DiagnosticAnalyzer {
    /// `store` is `None` when the vector store is not configured or failed to
    /// construct; the analyzer then answers with empty context rather than
    /// erroring.
    pub fn new(client: ChatClient, store: Option<VectorStore>) -> Self {
        Self { store, client }
    }

    async fn retrieve_context(&self, query: &str) -> String {
        let Some(store) = &self.store else {
            return String::new();
        };

        match store.mmr_search(query, RETRIEVAL_K, RETRIEVAL_FETCH_K).await {
            Ok(passages) => build_medical_context(&passages),
            Err(e) => {
                warn!("RAG retrieval failed: {}", e);
                String::new()
            }
        }
    }

    pub async fn analyze_case(
        &self,
        query: &str,
        vision_score: Option<f64>,
    ) -> Result<String, CoreError> {
        let context = self.retrieve_context(query).await;
        let prompt = build_prompt(query, &context, vision_score);
        self.client.chat(SYSTEM_PROMPT, &prompt, ANALYZER_OPTIONS).await
    }
}

fn build_prompt(query: &str, context: &str, vision_score: Option<f64>) -> String {
    let context_block = if context.is_empty() { NO_CONTEXT_LINE } else { context };

    let vision_block = vision_score
        .map(|s| format!("Teachable Machine Vision Score: {s} (Probability of Malignancy)\n\n"))
        .unwrap_or_default();

    format!(
        r#"You are an empathetic, expert Clinical Assistant.

Clinical Research Context (From Internal RAG DB):
{context_block}

{vision_block}User Query: {query}

Instructions:
1. Provide a conversational, highly concise, and relevant answer based on the context above.
2. DO NOT output heavily formatted, cluttered markdown with rigid structural headers (like "1. Clinical Summary 2. Diagnostic Analysis") unless explicitly asked to generate a full formal report.
3. If the user's query lacks context (for example, "Explain my report" but no text is provided), immediately stop and ask 1 or 2 specific clarifying questions to understand their situation better before jumping to conclusions.
4. Keep the tone helpful, human-like, and professional."#
    )
}

#[async_trait]
impl DiagnosticPath for DiagnosticAnalyzer {
    async fn analyze(&self, query: &str, vision_score: Option<f64>) -> Result<String, CoreError> {
        self.analyze_case(query, vision_score).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_query_and_context() {
        let prompt = build_prompt("is my nodule malignant?", "Source [A]: passage", None);
        assert!(prompt.contains("User Query: is my nodule malignant?"));
        assert!(prompt.contains("Source [A]: passage"));
        assert!(!prompt.contains("Teachable Machine"));
    }

    #[test]
    fn empty_context_uses_fixed_placeholder() {
        let prompt = build_prompt("q", "", None);
        assert!(prompt.contains("No distinct external RAG context available for this."));
    }

    #[test]
    fn vision_score_is_annotated_when_present() {
        let prompt = build_prompt("q", "", Some(0.87));
        assert!(prompt.contains("Teachable Machine Vision Score: 0.87 (Probability of Malignancy)"));
    }
}
