use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::jobs::repository::{insert_job, job_title_exists, NewJob};

pub const DEFAULT_JOB_TITLE: &str = "AI Engineer";

pub const DEFAULT_JOB_DESCRIPTION: &str = "\
We are looking for an AI Engineer with experience in Python, Machine Learning, and LLMs.

Responsibilities:
- Design and build AI agents using Gemini.
- Implement vector search over candidate embeddings.
- Integrate LLMs into web applications.

Requirements:
- 3+ years of Python experience.
- Experience with LangChain or Google GenAI.
- Familiarity with Vector Databases (ChromaDB, Pinecone).";

/// Creates the default "AI Engineer" posting unless a job with that title exists.
/// Returns true when a job was inserted.
pub async fn ensure_default_job(pool: &PgPool) -> Result<bool> {
    if job_title_exists(pool, DEFAULT_JOB_TITLE).await? {
        info!("'{DEFAULT_JOB_TITLE}' job already exists");
        return Ok(false);
    }

    insert_job(
        pool,
        NewJob {
            title: DEFAULT_JOB_TITLE,
            description: DEFAULT_JOB_DESCRIPTION,
            requirements: None,
        },
    )
    .await?;
    info!("Created '{DEFAULT_JOB_TITLE}' job");
    Ok(true)
}
