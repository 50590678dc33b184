use std::sync::Arc;

use sqlx::PgPool;

use crate::applicants::repository::ApplicantStore;
use crate::config::Config;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::storage::ResumeStore;
use crate::vector_store::ApplicantIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Writes made by the upload pipeline. Backed by `db` in production.
    pub applicants: Arc<dyn ApplicantStore>,
    pub storage: Arc<dyn ResumeStore>,
    /// Concrete client, used for model listing.
    pub llm: LlmClient,
    /// Generator the resume agents call. The same `LlmClient` in production.
    pub generator: Arc<dyn TextGenerator>,
    /// Embedding store for similarity search over applicants.
    pub index: ApplicantIndex,
    pub config: Config,
}
