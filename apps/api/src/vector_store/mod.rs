//! Applicant vector index.
//!
//! Stores one embedding per applicant and answers similarity queries with an
//! exact brute-force cosine scan. There is no ANN index: every query reads
//! every stored vector.
//!
//! - [`VectorStore`] is the storage seam (`PgVectorStore` in production,
//!   `InMemoryVectorStore` for tests and `VECTOR_STORE=memory`).
//! - [`ApplicantIndex`] pairs a store with an [`EmbeddingProvider`] so callers
//!   deal in text, not vectors.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::embedding::{cosine_similarity, EmbeddingProvider};

pub use memory::InMemoryVectorStore;
pub use postgres::PgVectorStore;

/// Documents longer than this are cut before embedding.
pub const MAX_DOCUMENT_CHARS: usize = 8000;
/// Upper bound on `n_results` for a single query.
pub const MAX_RESULTS: usize = 50;

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub applicant_id: Uuid,
    pub document: String,
    pub metadata: Value,
    pub embedding: Vec<f32>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarApplicant {
    pub applicant_id: Uuid,
    pub similarity: f32,
    pub metadata: Value,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces the record for `record.applicant_id`.
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Returns at most `n` records, most similar first.
    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<SimilarApplicant>>;

    /// Removes the record if present. Deleting a missing id is not an error.
    async fn delete(&self, applicant_id: Uuid) -> Result<()>;
}

/// Scores every candidate against `query` and keeps the best `n`.
/// Ties are broken by applicant id so results are stable.
pub(crate) fn top_n<I>(candidates: I, query: &[f32], n: usize) -> Vec<SimilarApplicant>
where
    I: IntoIterator<Item = (Uuid, Value, Vec<f32>)>,
{
    let mut scored: Vec<SimilarApplicant> = candidates
        .into_iter()
        .map(|(applicant_id, metadata, vector)| SimilarApplicant {
            applicant_id,
            similarity: cosine_similarity(query, &vector),
            metadata,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.applicant_id.cmp(&b.applicant_id))
    });
    scored.truncate(n);
    scored
}

fn truncate_document(text: &str) -> &str {
    match text.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Text-level facade over an embedder and a vector store.
#[derive(Clone)]
pub struct ApplicantIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl ApplicantIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embeds the applicant's resume text and upserts it with `metadata`.
    pub async fn add_applicant(&self, applicant_id: Uuid, text: &str, metadata: Value) -> Result<()> {
        let document = truncate_document(text.trim());
        if document.is_empty() {
            bail!("Cannot index applicant {applicant_id}: resume text is empty");
        }

        let embedding = self
            .embedder
            .embed(document)
            .await
            .with_context(|| format!("Failed to embed resume for applicant {applicant_id}"))?;

        self.store
            .upsert(VectorRecord {
                applicant_id,
                document: document.to_string(),
                metadata,
                embedding,
                model: self.embedder.model_name().to_string(),
            })
            .await?;

        debug!("Indexed applicant {applicant_id}");
        Ok(())
    }

    /// Finds the applicants closest to `query_text` (typically a job description).
    pub async fn query_similar_applicants(
        &self,
        query_text: &str,
        n_results: usize,
    ) -> Result<Vec<SimilarApplicant>> {
        let n = n_results.min(MAX_RESULTS);
        let query_text = truncate_document(query_text.trim());
        if n == 0 || query_text.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(query_text)
            .await
            .context("Failed to embed similarity query")?;

        self.store.query(&embedding, n).await
    }

    pub async fn delete_applicant(&self, applicant_id: Uuid) -> Result<()> {
        self.store.delete(applicant_id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;

    use crate::embedding::EmbeddingProvider;
    use crate::llm_client::LlmError;

    /// Bag-of-keywords embedder: one dimension per keyword, counting occurrences.
    pub struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
    }

    impl KeywordEmbedder {
        pub fn new(keywords: &[&'static str]) -> Self {
            Self {
                keywords: keywords.to_vec(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-test"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            let lower = text.to_lowercase();
            Ok(self
                .keywords
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }
    }

    /// Embedder that always fails, for rollback paths.
    pub struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::Api {
                status: 429,
                message: "Quota exceeded".to_string(),
            })
        }
    }
}
