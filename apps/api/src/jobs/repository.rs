use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::JobRow;

/// Fields accepted when creating a job.
pub struct NewJob<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub requirements: Option<&'a str>,
}

pub async fn insert_job(pool: &PgPool, job: NewJob<'_>) -> Result<JobRow> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs (id, title, description, requirements)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.title)
    .bind(job.description)
    .bind(job.requirements)
    .fetch_one(pool)
    .await?)
}

/// All jobs, newest first.
pub async fn list_jobs(pool: &PgPool) -> Result<Vec<JobRow>> {
    Ok(
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn job_title_exists(pool: &PgPool, title: &str) -> Result<bool> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM jobs WHERE title = $1)")
            .bind(title)
            .fetch_one(pool)
            .await?,
    )
}
