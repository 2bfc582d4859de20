//! Clinical text summarization via BART-large-CNN.
//!
//! The tch-backed model is not `Sync`, so a dedicated owner thread loads it
//! and serves requests over a channel; async callers get their summary back
//! through a oneshot. Deterministic beam search keeps summaries reproducible.

use std::sync::mpsc;

use onco_core::CoreError;
use rust_bert::bart::{
    BartConfigResources, BartMergesResources, BartModelResources, BartVocabResources,
};
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::summarization::{SummarizationConfig, SummarizationModel};
use rust_bert::resources::RemoteResource;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Inputs shorter than this are not worth a model call.
const MIN_INPUT_CHARS: usize = 30;

/// Hard character budget applied before tokenization; protects against the
/// model's input-length limit (~1024 tokens).
const MAX_INPUT_CHARS: usize = 3500;

pub const TOO_SHORT_MESSAGE: &str = "Text is too short to summarize effectively.";

/// Outcome of the pre-model input policy.
#[derive(Debug, PartialEq, Eq)]
pub enum SummarizeInput {
    TooShort,
    Ready(String),
}

/// Applies the minimum-length and truncation policy. Pure, so the "model is
/// never invoked for unusable input" property is testable without weights.
pub fn prepare_input(text: &str) -> SummarizeInput {
    let trimmed = text.trim();
    if trimmed.len() < MIN_INPUT_CHARS {
        return SummarizeInput::TooShort;
    }
    let mut budget = MAX_INPUT_CHARS;
    while !trimmed.is_char_boundary(budget.min(trimmed.len())) {
        budget -= 1;
    }
    SummarizeInput::Ready(trimmed[..budget.min(trimmed.len())].to_string())
}

struct SummarizeJob {
    text: String,
    reply: oneshot::Sender<Result<String, CoreError>>,
}

/// Handle to the summarization owner thread.
pub struct Summarizer {
    tx: mpsc::Sender<SummarizeJob>,
}

impl Summarizer {
    /// Spawns the owner thread. The model loads on that thread; if loading
    /// fails, the handle stays usable and every request gets a typed error.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<SummarizeJob>();

        std::thread::Builder::new()
            .name("summarizer".into())
            .spawn(move || owner_loop(&rx))
            .expect("failed to spawn summarizer thread");

        Self { tx }
    }

    pub async fn summarize(&self, text: &str) -> Result<String, CoreError> {
        let prepared = match prepare_input(text) {
            SummarizeInput::TooShort => return Ok(TOO_SHORT_MESSAGE.to_string()),
            SummarizeInput::Ready(t) => t,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SummarizeJob { text: prepared, reply: reply_tx })
            .map_err(|_| CoreError::Inference("summarizer thread is gone".into()))?;

        reply_rx
            .await
            .map_err(|_| CoreError::Inference("summarizer dropped the request".into()))?
    }
}

fn owner_loop(rx: &mpsc::Receiver<SummarizeJob>) {
    info!("Loading BART summarization model...");
    let model = match SummarizationModel::new(bart_cnn_config()) {
        Ok(m) => {
            info!("Summarization model loaded");
            Ok(m)
        }
        Err(e) => {
            error!("Failed to load summarization model: {}", e);
            Err(e.to_string())
        }
    };

    while let Ok(job) = rx.recv() {
        let result = match &model {
            Ok(model) => model
                .summarize(&[job.text.as_str()])
                .map_err(|e| CoreError::Inference(e.to_string()))
                .and_then(|mut summaries| {
                    if summaries.is_empty() {
                        Err(CoreError::Inference("model produced no summary".into()))
                    } else {
                        Ok(summaries.remove(0))
                    }
                }),
            Err(load_error) => Err(CoreError::Inference(format!(
                "summarization model failed to load: {load_error}"
            ))),
        };
        // Caller may have given up; nothing to do if the reply slot is gone.
        let _ = job.reply.send(result);
    }
}

fn bart_cnn_config() -> SummarizationConfig {
    SummarizationConfig {
        model_type: ModelType::Bart,
        model_resource: ModelResource::Torch(Box::new(RemoteResource::from_pretrained(
            BartModelResources::BART_CNN,
        ))),
        config_resource: Box::new(RemoteResource::from_pretrained(BartConfigResources::BART_CNN)),
        vocab_resource: Box::new(RemoteResource::from_pretrained(BartVocabResources::BART_CNN)),
        merges_resource: Some(Box::new(RemoteResource::from_pretrained(
            BartMergesResources::BART_CNN,
        ))),
        min_length: 40,
        max_length: Some(150),
        length_penalty: 2.0,
        num_beams: 4,
        early_stopping: true,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_rejected_before_the_model() {
        assert_eq!(prepare_input("too short"), SummarizeInput::TooShort);
        assert_eq!(prepare_input("   "), SummarizeInput::TooShort);
    }

    #[test]
    fn long_input_is_truncated_to_the_character_budget() {
        let long = "x".repeat(10_000);
        match prepare_input(&long) {
            SummarizeInput::Ready(t) => assert_eq!(t.len(), MAX_INPUT_CHARS),
            SummarizeInput::TooShort => panic!("long input should be ready"),
        }
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let mut text = "a".repeat(MAX_INPUT_CHARS - 1);
        text.push('é');
        text.push_str(&"b".repeat(100));
        match prepare_input(&text) {
            SummarizeInput::Ready(t) => assert!(t.len() <= MAX_INPUT_CHARS),
            SummarizeInput::TooShort => panic!("input should be ready"),
        }
    }

    #[tokio::test]
    async fn too_short_text_returns_fixed_message_without_a_live_model() {
        // Handle whose thread never gets a job: the policy answers first.
        let summarizer = Summarizer::spawn();
        let out = summarizer.summarize("tiny").await.unwrap();
        assert_eq!(out, TOO_SHORT_MESSAGE);
    }
}
