//! Axum route handlers for the Applicants API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applicants::pipeline::process_upload;
use crate::applicants::repository::{get_applicant, get_applicant_detail, list_dashboard};
use crate::applicants::upload::read_resume_field;
use crate::errors::AppError;
use crate::jobs::repository::get_job;
use crate::models::applicant::{ApplicantDetail, DashboardRow};
use crate::state::AppState;
use crate::vector_store::SimilarApplicant;

/// Default number of results for similarity queries.
pub const DEFAULT_SIMILAR_RESULTS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub applicants: Vec<DashboardRow>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarSearchRequest {
    pub query_text: String,
    pub n_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarSearchResponse {
    pub results: Vec<SimilarApplicant>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/applicants
///
/// General application (no job). Multipart field `resume` (.pdf or .docx).
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicantDetail>), AppError> {
    let upload = read_resume_field(&mut multipart).await?;
    let detail = process_upload(&state, None, upload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /api/v1/jobs/:id/apply
///
/// Application to a specific job; the job description drives ranking.
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicantDetail>), AppError> {
    let job = get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let upload = read_resume_field(&mut multipart).await?;
    let detail = process_upload(&state, Some(job), upload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/dashboard
///
/// Applicants ranked by total evaluation score. Optional `job_id` filter.
pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let applicants = list_dashboard(&state.db, params.job_id).await?;
    Ok(Json(DashboardResponse { applicants }))
}

/// GET /api/v1/applicants/:id
pub async fn handle_get_applicant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicantDetail>, AppError> {
    let detail = get_applicant_detail(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Applicant {id} not found")))?;
    Ok(Json(detail))
}

/// GET /api/v1/applicants/:id/resume
///
/// Streams back the originally uploaded file.
pub async fn handle_download_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let applicant = get_applicant(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Applicant {id} not found")))?;

    let stored = state.storage.get_resume(&applicant.resume_key).await?;
    let content_type = stored
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        crate::storage::sanitize_filename(&applicant.resume_filename)
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        stored.bytes,
    )
        .into_response())
}

/// POST /api/v1/search/similar
///
/// Free-text similarity search over indexed resumes.
pub async fn handle_similar_search(
    State(state): State<AppState>,
    Json(request): Json<SimilarSearchRequest>,
) -> Result<Json<SimilarSearchResponse>, AppError> {
    if request.query_text.trim().is_empty() {
        return Err(AppError::Validation("query_text cannot be empty".to_string()));
    }

    let results = state
        .index
        .query_similar_applicants(
            &request.query_text,
            request.n_results.unwrap_or(DEFAULT_SIMILAR_RESULTS),
        )
        .await?;
    Ok(Json(SimilarSearchResponse { results }))
}
