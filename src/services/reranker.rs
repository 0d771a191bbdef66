//! Cross-encoder reranking.
//!
//! Second-stage scoring: the coarse vector-distance candidates are
//! rescored pairwise against the query by a cross-encoder model, then
//! sorted by that score and truncated.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::error::ModelError;
use crate::models::{RerankerConfig, SearchCandidate};
use crate::services::embedding::load_session;

/// Scores (query, passage) pairs; higher means more relevant.
/// A single call covers the whole candidate batch.
pub trait CrossEncoder {
    fn model_name(&self) -> &str;

    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, ModelError>;
}

/// ONNX-backed cross-encoder. Scores are sigmoid-squashed logits in
/// (0, 1).
pub struct OnnxCrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
}

impl OnnxCrossEncoder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(config: &RerankerConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let (session, tokenizer) = load_session(model_dir, config.max_tokens)?;
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_name: config.model_name.clone(),
        })
    }
}

impl CrossEncoder for OnnxCrossEncoder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = texts
            .iter()
            .map(|text| (query.to_string(), text.clone()))
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len() {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array(([batch_size, max_len], attention_mask))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                input_ids_tensor,
                attention_mask_tensor,
                token_type_ids_tensor
            ])
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let shape = output_array.shape();

        // Single-label classification head: [batch, 1] logits, or
        // [batch] from models that squeeze the trailing axis.
        let scores: Vec<f32> = if shape.len() == 2 && shape[1] == 1 {
            (0..batch_size).map(|i| sigmoid(output_array[[i, 0]])).collect()
        } else if shape.len() == 1 {
            (0..batch_size).map(|i| sigmoid(output_array[[i]])).collect()
        } else {
            return Err(ModelError::InferenceError(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        };

        Ok(scores)
    }
}

/// Rescore `candidates` against `query` and keep the best `top_k`.
///
/// Output is sorted strictly descending by `rerank_score`; truncation
/// happens after sorting. The sort is stable, so exact ties keep the
/// ascending-distance order the store returned. Empty input returns
/// empty output without touching the model.
pub fn rerank(
    model: &dyn CrossEncoder,
    query: &str,
    mut candidates: Vec<SearchCandidate>,
    top_k: usize,
) -> Result<Vec<SearchCandidate>, ModelError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let scores = model.score_pairs(query, &texts)?;

    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.rerank_score = Some(score);
    }

    candidates.sort_by(|a, b| {
        b.rerank_score
            .partial_cmp(&a.rerank_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(top_k);

    Ok(candidates)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
