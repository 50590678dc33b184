//! PostgreSQL-backed [`VectorStore`]: vectors live in a `REAL[]` column and
//! similarity is computed in-process over a full table scan.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{top_n, SimilarApplicant, VectorRecord, VectorStore};

#[derive(Debug, FromRow)]
struct EmbeddingRow {
    applicant_id: Uuid,
    metadata: Value,
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applicant_embeddings (applicant_id, document, metadata, embedding, model)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (applicant_id) DO UPDATE
            SET document = EXCLUDED.document,
                metadata = EXCLUDED.metadata,
                embedding = EXCLUDED.embedding,
                model = EXCLUDED.model,
                updated_at = now()
            "#,
        )
        .bind(record.applicant_id)
        .bind(&record.document)
        .bind(&record.metadata)
        .bind(&record.embedding)
        .bind(&record.model)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<SimilarApplicant>> {
        let rows = sqlx::query_as::<_, EmbeddingRow>(
            "SELECT applicant_id, metadata, embedding FROM applicant_embeddings",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(top_n(
            rows.into_iter()
                .map(|r| (r.applicant_id, r.metadata, r.embedding)),
            embedding,
            n,
        ))
    }

    async fn delete(&self, applicant_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM applicant_embeddings WHERE applicant_id = $1")
            .bind(applicant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
