//! In-memory [`VectorStore`] for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use super::{top_n, SimilarApplicant, VectorRecord, VectorStore};

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<Uuid, VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn record_count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn contains(&self, applicant_id: Uuid) -> bool {
        self.records
            .read()
            .map(|r| r.contains_key(&applicant_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        records.insert(record.applicant_id, record);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<SimilarApplicant>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        Ok(top_n(
            records
                .values()
                .map(|r| (r.applicant_id, r.metadata.clone(), r.embedding.clone())),
            embedding,
            n,
        ))
    }

    async fn delete(&self, applicant_id: Uuid) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("vector store lock poisoned"))?;
        records.remove(&applicant_id);
        Ok(())
    }
}
