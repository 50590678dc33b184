//! Resume upload pipeline.
//!
//! Flow: create applicant → store file → extract text → orchestrator (parse,
//! skills, rank) → index embedding → persist results in one transaction.
//!
//! Any failure after the applicant row exists deletes that row, its index entry
//! and the stored file, and surfaces as 422 `ProcessingFailed`. A resume with no
//! extractable text is kept as-is without analysis. Applicants replaced by email
//! are only cleaned up once the new applicant's transaction commits.

use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::orchestrator::{Orchestrator, ResumeAnalysis};
use crate::agents::parsing::ParseOutcome;
use crate::applicants::repository::{self, AnalysisRecord, ApplicantStore, ReplacedApplicant};
use crate::applicants::upload::ResumeUpload;
use crate::errors::AppError;
use crate::extract::{extract_text, ResumeFormat};
use crate::llm_client::TextGenerator;
use crate::models::applicant::ApplicantDetail;
use crate::models::job::JobRow;
use crate::state::AppState;
use crate::storage::{resume_key, ResumeStore};
use crate::vector_store::ApplicantIndex;

pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse resume or AI quota exceeded.";
const SAVE_FAILURE_MESSAGE: &str = "could not save analysis results";

/// Runs the full pipeline for one upload and returns the stored applicant.
pub async fn process_upload(
    state: &AppState,
    job: Option<JobRow>,
    upload: ResumeUpload,
) -> Result<ApplicantDetail, AppError> {
    let applicant_id = UploadPipeline::from_state(state)
        .run(job.as_ref(), upload)
        .await?;

    let detail = repository::get_applicant_detail(&state.db, applicant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Applicant {applicant_id} not found")))?;
    info!(
        "Processed resume for applicant {} ({})",
        applicant_id,
        detail.applicant.display_name()
    );
    Ok(detail)
}

/// The collaborators one upload touches.
pub struct UploadPipeline<'a> {
    pub applicants: &'a dyn ApplicantStore,
    pub files: &'a dyn ResumeStore,
    pub generator: &'a dyn TextGenerator,
    pub index: &'a ApplicantIndex,
}

impl<'a> UploadPipeline<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            applicants: state.applicants.as_ref(),
            files: state.storage.as_ref(),
            generator: state.generator.as_ref(),
            index: &state.index,
        }
    }

    /// Creates the applicant and analyses the resume. Returns the new applicant id.
    pub async fn run(&self, job: Option<&JobRow>, upload: ResumeUpload) -> Result<Uuid, AppError> {
        let format = ResumeFormat::from_filename(&upload.filename)
            .map_err(|e| AppError::Validation(format!("{e}. Upload a .pdf or .docx file.")))?;

        let applicant_id = Uuid::new_v4();
        let key = resume_key(applicant_id, &upload.filename);

        self.applicants
            .insert_applicant(applicant_id, job.map(|j| j.id), &key, &upload.filename)
            .await?;
        info!(
            "Created applicant {applicant_id} for {}",
            job.map(|j| j.title.as_str()).unwrap_or("general application")
        );

        let replaced = match self.analyse(applicant_id, job, format, &key, upload).await {
            Ok(replaced) => replaced,
            Err(e) => {
                self.rollback(applicant_id, &key).await;
                return Err(processing_failure(e));
            }
        };

        if !replaced.is_empty() {
            info!(
                "Replaced {} earlier applicant(s) with the same email",
                replaced.len()
            );
        }
        for old in replaced {
            self.cleanup_replaced(&old).await;
        }

        Ok(applicant_id)
    }

    async fn analyse(
        &self,
        applicant_id: Uuid,
        job: Option<&JobRow>,
        format: ResumeFormat,
        key: &str,
        upload: ResumeUpload,
    ) -> Result<Vec<ReplacedApplicant>, AppError> {
        // 1. Store the original file
        self.files
            .put_resume(key, upload.bytes.clone(), format.content_type())
            .await?;

        // 2. Extract text (pdf parsing is CPU-bound)
        let bytes = upload.bytes;
        let resume_text = tokio::task::spawn_blocking(move || extract_text(&bytes, format))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Text extraction task failed: {e}")))??;
        if resume_text.trim().is_empty() {
            info!("No text extracted for applicant {applicant_id}; keeping it without analysis");
            return Ok(Vec::new());
        }

        // 3. Analyse
        let job_description = job.map(|j| j.description.as_str()).unwrap_or("");
        let ResumeAnalysis {
            parsed,
            skills,
            ranking,
        } = Orchestrator::new(self.generator)
            .process_resume(&resume_text, job_description)
            .await;
        let parsed = require_parsed(parsed)?;

        // 4. Index embedding. Runs before the transaction so no connection is
        //    held across the embedding call; rollback removes the entry.
        self.index
            .add_applicant(
                applicant_id,
                &resume_text,
                index_metadata(parsed.resume.name.as_deref(), job),
            )
            .await
            .map_err(|e| AppError::ProcessingFailed(format!("{e:#}")))?;

        // 5. Persist structured results
        let (skill_names, skill_confidence) = match &skills {
            Some(s) => (s.normalized_tech_skills(), s.confidence_score),
            None => (Vec::new(), 0.0),
        };
        let replaced = self
            .applicants
            .save_analysis(AnalysisRecord {
                applicant_id,
                resume: &parsed.resume,
                parsed_data: &parsed.raw,
                skill_names,
                skill_confidence,
                ranking: ranking.as_ref(),
            })
            .await
            .map_err(|e| {
                error!("Failed to save analysis for applicant {applicant_id}: {e:#}");
                AppError::ProcessingFailed(SAVE_FAILURE_MESSAGE.to_string())
            })?;

        Ok(replaced)
    }

    async fn rollback(&self, applicant_id: Uuid, key: &str) {
        warn!("Rolling back applicant {applicant_id}");

        if let Err(e) = self.applicants.delete_applicant(applicant_id).await {
            warn!("Failed to delete applicant {applicant_id} during rollback: {e:#}");
        }
        if let Err(e) = self.index.delete_applicant(applicant_id).await {
            warn!("Failed to remove applicant {applicant_id} from index during rollback: {e:#}");
        }
        if let Err(e) = self.files.delete_resume(key).await {
            warn!("Failed to delete stored resume {key} during rollback: {e}");
        }
    }

    async fn cleanup_replaced(&self, old: &ReplacedApplicant) {
        if let Err(e) = self.index.delete_applicant(old.id).await {
            warn!("Failed to remove replaced applicant {} from index: {e:#}", old.id);
        }
        if let Err(e) = self.files.delete_resume(&old.resume_key).await {
            warn!("Failed to delete replaced resume {}: {e}", old.resume_key);
        }
    }
}

/// The parse result is the only mandatory agent output.
pub fn require_parsed(parsed: Option<ParseOutcome>) -> Result<ParseOutcome, AppError> {
    parsed.ok_or_else(|| AppError::ProcessingFailed(PARSE_FAILURE_MESSAGE.to_string()))
}

/// Metadata stored next to each applicant's embedding.
pub fn index_metadata(name: Option<&str>, job: Option<&JobRow>) -> Value {
    json!({
        "name": name.unwrap_or("Unknown"),
        "job": job.map(|j| j.title.as_str()).unwrap_or("General"),
    })
}

/// Every failure after the applicant row exists becomes 422 `ProcessingFailed`.
/// Infrastructure errors are logged in full and reported by category only.
pub fn processing_failure(e: AppError) -> AppError {
    let reason = match e {
        AppError::ProcessingFailed(msg) => return AppError::ProcessingFailed(msg),
        AppError::Extraction(inner) => return AppError::ProcessingFailed(inner.to_string()),
        AppError::S3(_) => "could not store the resume file",
        _ => "unexpected error while processing the resume",
    };
    error!("Resume pipeline failed: {e}");
    AppError::ProcessingFailed(reason.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use chrono::Utc;

    use super::*;
    use crate::agents::parsing::ParsedResume;
    use crate::agents::testing::{Reply, ScriptedGenerator};
    use crate::applicants::repository::testing::InMemoryApplicantStore;
    use crate::extract::testing::docx_from_lines;
    use crate::extract::ExtractError;
    use crate::storage::testing::InMemoryResumeStore;
    use crate::vector_store::testing::{FailingEmbedder, KeywordEmbedder};
    use crate::vector_store::InMemoryVectorStore;

    const PARSED_JANE: &str =
        r#"{"name": "Jane Doe", "email": "Jane@Example.com", "education": null}"#;
    const SKILLS: &str = r#"{"tech_skills": ["Python", " python", "Django", "RUST"], "soft_skills": ["Teamwork"], "confidence_score": 0.9}"#;
    const RANKING: &str =
        r#"{"total_score": 81, "skill_score": 88, "experience_score": 72, "reason": "Solid."}"#;

    struct Harness {
        applicants: InMemoryApplicantStore,
        files: InMemoryResumeStore,
        generator: ScriptedGenerator,
        store: Arc<InMemoryVectorStore>,
        index: ApplicantIndex,
    }

    impl Harness {
        fn new(parse: Reply) -> Self {
            Self::build(parse, InMemoryApplicantStore::default(), false)
        }

        fn build(parse: Reply, applicants: InMemoryApplicantStore, failing_embedder: bool) -> Self {
            let store = Arc::new(InMemoryVectorStore::new());
            let index = if failing_embedder {
                ApplicantIndex::new(Arc::new(FailingEmbedder), store.clone())
            } else {
                ApplicantIndex::new(
                    Arc::new(KeywordEmbedder::new(&["python", "rust"])),
                    store.clone(),
                )
            };
            Self {
                applicants,
                files: InMemoryResumeStore::default(),
                generator: ScriptedGenerator::new(parse, Ok(SKILLS), Ok(RANKING)),
                store,
                index,
            }
        }

        fn pipeline(&self) -> UploadPipeline<'_> {
            UploadPipeline {
                applicants: &self.applicants,
                files: &self.files,
                generator: &self.generator,
                index: &self.index,
            }
        }
    }

    fn resume_upload(lines: &[&str]) -> ResumeUpload {
        ResumeUpload {
            filename: "jane.docx".to_string(),
            bytes: Bytes::from(docx_from_lines(lines)),
        }
    }

    fn job(title: &str) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "Python backend engineer".to_string(),
            requirements: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upload_persists_analysis_and_indexes() {
        let h = Harness::new(Ok(PARSED_JANE));
        let job = job("AI Engineer");
        let id = h
            .pipeline()
            .run(Some(&job), resume_upload(&["Jane Doe", "Python and Rust"]))
            .await
            .unwrap();

        let row = h.applicants.get(id).expect("applicant kept");
        assert!(row.analysed);
        assert_eq!(row.name.as_deref(), Some("Jane Doe"));
        assert_eq!(row.job_id, Some(job.id));
        assert_eq!(row.email.as_deref(), Some("jane@example.com"));
        assert_eq!(row.skills, vec!["python", "django", "rust"]);
        assert_eq!(row.ranking.map(|r| r.total_score), Some(81));
        assert!(h.files.contains(&row.resume_key));
        assert!(h.store.contains(id));
        // the job description reaches the ranking agent
        assert!(h
            .generator
            .recorded()
            .iter()
            .any(|p| p.contains("Job Description: Python backend engineer")));
    }

    #[tokio::test]
    async fn test_same_email_replaces_earlier_applicant() {
        let h = Harness::new(Ok(PARSED_JANE));
        let first = h
            .pipeline()
            .run(None, resume_upload(&["Jane Doe", "Python"]))
            .await
            .unwrap();
        let first_key = h.applicants.get(first).unwrap().resume_key;

        let second = h
            .pipeline()
            .run(None, resume_upload(&["Jane Doe", "Rust"]))
            .await
            .unwrap();

        assert_eq!(h.applicants.ids(), vec![second]);
        assert!(!h.files.contains(&first_key));
        assert!(!h.store.contains(first));
        assert!(h.store.contains(second));
    }

    #[tokio::test]
    async fn test_parse_failure_rolls_back_everything() {
        let h = Harness::new(Err(429));
        let err = h
            .pipeline()
            .run(None, resume_upload(&["Jane Doe"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProcessingFailed(msg) if msg == PARSE_FAILURE_MESSAGE));
        assert!(h.applicants.ids().is_empty());
        assert!(h.files.keys().is_empty());
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_no_writes() {
        let h = Harness::build(Ok(PARSED_JANE), InMemoryApplicantStore::default(), true);
        let err = h
            .pipeline()
            .run(None, resume_upload(&["Jane Doe", "Python"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProcessingFailed(_)));
        assert!(h.applicants.ids().is_empty());
        assert!(h.files.keys().is_empty());
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_database_failure_removes_index_entry_and_file() {
        let h = Harness::build(
            Ok(PARSED_JANE),
            InMemoryApplicantStore::failing_saves(),
            false,
        );
        let err = h
            .pipeline()
            .run(None, resume_upload(&["Jane Doe", "Python"]))
            .await
            .unwrap_err();

        match err {
            AppError::ProcessingFailed(msg) => assert_eq!(msg, SAVE_FAILURE_MESSAGE),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.applicants.ids().is_empty());
        assert!(h.files.keys().is_empty());
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_keeps_applicant_without_analysis() {
        let h = Harness::new(Ok(PARSED_JANE));
        let id = h.pipeline().run(None, resume_upload(&[])).await.unwrap();

        let row = h.applicants.get(id).expect("applicant kept");
        assert!(!row.analysed);
        assert!(h.files.contains(&row.resume_key));
        assert!(!h.store.contains(id));
        assert!(h.generator.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_processing_failure() {
        let h = Harness::new(Ok(PARSED_JANE));
        let upload = ResumeUpload {
            filename: "broken.docx".to_string(),
            bytes: Bytes::from_static(b"not a zip archive"),
        };
        let err = h.pipeline().run(None, upload).await.unwrap_err();

        assert!(matches!(err, AppError::ProcessingFailed(_)));
        assert!(h.applicants.ids().is_empty());
        assert!(h.files.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_format_creates_nothing() {
        let h = Harness::new(Ok(PARSED_JANE));
        let upload = ResumeUpload {
            filename: "resume.txt".to_string(),
            bytes: Bytes::from_static(b"plain text"),
        };
        let err = h.pipeline().run(None, upload).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.applicants.ids().is_empty());
    }

    #[test]
    fn test_index_metadata_defaults() {
        assert_eq!(
            index_metadata(None, None),
            json!({"name": "Unknown", "job": "General"})
        );
    }

    #[test]
    fn test_index_metadata_with_job() {
        let job = job("AI Engineer");
        assert_eq!(
            index_metadata(Some("Jane Doe"), Some(&job)),
            json!({"name": "Jane Doe", "job": "AI Engineer"})
        );
    }

    #[test]
    fn test_present_parse_passes_through() {
        let outcome = ParseOutcome {
            resume: ParsedResume {
                name: Some("Jane".to_string()),
                ..Default::default()
            },
            raw: json!({"name": "Jane"}),
        };
        let parsed = require_parsed(Some(outcome)).unwrap();
        assert_eq!(parsed.resume.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_extraction_errors_keep_their_reason() {
        let e = processing_failure(AppError::Extraction(ExtractError::Pdf(
            "bad xref".to_string(),
        )));
        assert!(matches!(e, AppError::ProcessingFailed(msg) if msg.contains("bad xref")));
    }

    #[test]
    fn test_infrastructure_errors_become_processing_failures() {
        let e = processing_failure(AppError::S3("bucket missing".to_string()));
        match e {
            AppError::ProcessingFailed(msg) => {
                assert_eq!(msg, "could not store the resume file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let e = processing_failure(AppError::Internal(anyhow::anyhow!("pool timed out")));
        assert!(matches!(e, AppError::ProcessingFailed(msg) if !msg.contains("pool")));
    }
}
