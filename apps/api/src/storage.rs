//! Resume file storage in S3 / MinIO.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Bytes and content type of a stored resume.
pub struct StoredResume {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Where uploaded resume files live. `S3ResumeStore` in production.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn put_resume(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;

    async fn get_resume(&self, key: &str) -> Result<StoredResume, AppError>;

    /// Deleting a missing key is not an error.
    async fn delete_resume(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct S3ResumeStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResumeStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ResumeStore for S3ResumeStore {
    async fn put_resume(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get_resume(&self, key: &str) -> Result<StoredResume, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("download of {key} failed: {e}")))?;

        let content_type = object.content_type().map(str::to_string);
        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("reading {key} failed: {e}")))?
            .into_bytes();

        Ok(StoredResume {
            bytes,
            content_type,
        })
    }

    async fn delete_resume(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;
        Ok(())
    }
}

/// Object key for an applicant's resume: `resumes/{applicant_id}/{filename}`.
pub fn resume_key(applicant_id: Uuid, filename: &str) -> String {
    format!("resumes/{}/{}", applicant_id, sanitize_filename(filename))
}

/// Keeps only the final path component, replacing anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned.to_string()
    }
}
