//! Embedding provider trait and vector similarity.

use async_trait::async_trait;

use crate::llm_client::{LlmClient, LlmError};

/// Turns text into a dense vector. Implemented by `LlmClient` (Gemini embeddings);
/// tests use deterministic fakes.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier stored alongside each vector.
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

#[async_trait]
impl EmbeddingProvider for LlmClient {
    fn model_name(&self) -> &str {
        self.embedding_model()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        LlmClient::embed(self, text).await
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
