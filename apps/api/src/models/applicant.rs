use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantRow {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience_summary: Option<String>,
    pub resume_key: String,
    pub resume_filename: String,
    pub parsed_data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ApplicantRow {
    /// Name, then email, then a placeholder.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown Applicant")
    }
}

/// A skill attached to an applicant, joined with the skill name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantSkillRow {
    pub skill_id: Uuid,
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub applicant_id: Uuid,
    pub total_score: i32,
    pub skill_score: i32,
    pub experience_score: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One line of the ranked dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DashboardRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub job_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub total_score: Option<i32>,
    pub skill_score: Option<i32>,
    pub experience_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Everything the applicant detail view shows.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantDetail {
    #[serde(flatten)]
    pub applicant: ApplicantRow,
    pub job: Option<super::job::JobRow>,
    pub skills: Vec<ApplicantSkillRow>,
    pub evaluation: Option<EvaluationRow>,
}
