use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// Multipart field carrying the resume file.
pub const RESUME_FIELD: &str = "resume";

/// A resume file received from the client.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Reads the `resume` field from a multipart body. Other fields are ignored.
pub async fn read_resume_field(multipart: &mut Multipart) -> Result<ResumeUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Resume upload must include a filename".to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read resume file: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded resume is empty".to_string()));
        }

        return Ok(ResumeUpload { filename, bytes });
    }

    Err(AppError::Validation("No resume file provided".to_string()))
}
