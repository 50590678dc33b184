//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applicants::handlers::{SimilarSearchResponse, DEFAULT_SIMILAR_RESULTS};
use crate::errors::AppError;
use crate::jobs::repository::{get_job, insert_job, list_jobs, NewJob};
use crate::models::job::JobRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("description cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRow>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub n: Option<usize>,
}

/// GET /api/v1/jobs
///
/// Career page: every open job, newest first.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    let jobs = list_jobs(&state.db).await?;
    Ok(Json(JobListResponse { jobs }))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    request.validate()?;

    let requirements = request
        .requirements
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let job = insert_job(
        &state.db,
        NewJob {
            title: request.title.trim(),
            description: request.description.trim(),
            requirements,
        },
    )
    .await?;

    tracing::info!("Created job {} ({})", job.id, job.title);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    let job = get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// GET /api/v1/jobs/:id/similar?n=5
///
/// Applicants whose resumes are closest to the job description.
pub async fn handle_similar_for_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<SimilarQuery>,
) -> Result<Json<SimilarSearchResponse>, AppError> {
    let job = get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    let results = state
        .index
        .query_similar_applicants(&job.description, params.n.unwrap_or(DEFAULT_SIMILAR_RESULTS))
        .await?;
    Ok(Json(SimilarSearchResponse { results }))
}
