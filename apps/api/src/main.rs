mod agents;
mod applicants;
mod config;
mod db;
mod embedding;
mod errors;
mod extract;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;
mod vector_store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applicants::repository::PgApplicantStore;
use crate::config::{Config, VectorStoreBackend};
use crate::db::create_pool;
use crate::jobs::seed::ensure_default_job;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3ResumeStore;
use crate::vector_store::{ApplicantIndex, InMemoryVectorStore, PgVectorStore, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    if config.seed_default_job {
        ensure_default_job(&db).await?;
    }

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage = Arc::new(S3ResumeStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(
        config.google_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_fallback_model.clone(),
        config.gemini_embedding_model.clone(),
    );
    info!(
        "LLM client initialized (model: {}, embeddings: {})",
        llm.primary_model(),
        llm.embedding_model()
    );

    // Initialize vector index
    let store: Arc<dyn VectorStore> = match config.vector_store {
        VectorStoreBackend::Postgres => Arc::new(PgVectorStore::new(db.clone())),
        VectorStoreBackend::Memory => {
            info!("Using in-memory vector store; embeddings are lost on restart");
            Arc::new(InMemoryVectorStore::new())
        }
    };
    let index = ApplicantIndex::new(Arc::new(llm.clone()), store);

    // Build app state
    let state = AppState {
        applicants: Arc::new(PgApplicantStore::new(db.clone())),
        db,
        storage,
        generator: Arc::new(llm.clone()),
        llm,
        index,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "ats-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets under the path, not a subdomain.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
