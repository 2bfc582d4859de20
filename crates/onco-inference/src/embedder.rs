//! Query embedder: all-MiniLM-L6-v2 over ONNX Runtime.
//!
//! Expects a model directory containing `model.onnx` and `tokenizer.json`.
//! Produces mean-pooled, L2-normalized 384-dim vectors matching the
//! embeddings the corpus was indexed with.

use std::path::Path;
use std::sync::Mutex;

use onco_core::{CoreError, TextEmbedder};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// ort::Session::run requires `&mut self`; the Mutex lets the embedder sit
/// behind an `Arc<dyn TextEmbedder>` shared across requests.
pub struct MiniLmEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self, CoreError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(CoreError::Inference(format!(
                "embedding model files missing under {}",
                model_dir.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| CoreError::Inference(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| CoreError::Inference(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| CoreError::Inference(format!("ONNX load failed: {e}")))?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| CoreError::Inference(format!("tokenizer load failed: {e}")))?;

        info!("MiniLM embedder loaded from {}", model_dir.display());

        Ok(Self { session: Mutex::new(session), tokenizer })
    }

    fn infer(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| CoreError::Inference(format!("tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> =
            encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
        let token_type_ids: Vec<i64> =
            encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let seq_len = input_ids.len();
        let shape_err = |e: ndarray::ShapeError| CoreError::Inference(e.to_string());

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids).map_err(shape_err)?;
        let mask_array =
            ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone()).map_err(shape_err)?;
        let type_array =
            ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids).map_err(shape_err)?;

        let tensor_err = |e: ort::Error| CoreError::Inference(e.to_string());
        let ids_tensor = TensorRef::from_array_view(&ids_array).map_err(tensor_err)?;
        let mask_tensor = TensorRef::from_array_view(&mask_array).map_err(tensor_err)?;
        let type_tensor = TensorRef::from_array_view(&type_array).map_err(tensor_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| CoreError::Inference("embedder session lock poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
            .map_err(|e| CoreError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| CoreError::Inference(format!("output extraction failed: {e}")))?;

        if shape.len() != 3 || shape[2] as usize != EMBEDDING_DIM {
            return Err(CoreError::Inference(format!(
                "unexpected output shape {shape:?}, expected [1, {seq_len}, {EMBEDDING_DIM}]"
            )));
        }

        Ok(mean_pool_normalize(output_data, &attention_mask, EMBEDDING_DIM))
    }
}

/// Attention-masked mean pooling over token embeddings followed by L2
/// normalization.
fn mean_pool_normalize(token_embeddings: &[f32], attention_mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut mask_sum = 0.0f32;

    for (token_idx, &mask_val) in attention_mask.iter().enumerate() {
        let mask_val = mask_val as f32;
        mask_sum += mask_val;
        let offset = token_idx * dim;
        for (dim_idx, p) in pooled.iter_mut().enumerate() {
            *p += token_embeddings[offset + dim_idx] * mask_val;
        }
    }

    if mask_sum > 0.0 {
        for val in &mut pooled {
            *val /= mask_sum;
        }
    }

    let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut pooled {
            *val /= norm;
        }
    }

    pooled
}

impl TextEmbedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        self.infer(text)
    }

    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }
}
