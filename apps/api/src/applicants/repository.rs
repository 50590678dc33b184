//! SQL for applicants, skills and evaluations.
//!
//! The upload pipeline writes through [`ApplicantStore`]; read paths used by
//! the handlers are plain functions over the pool.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::agents::parsing::ParsedResume;
use crate::agents::ranking::Ranking;
use crate::jobs::repository::get_job;
use crate::models::applicant::{
    ApplicantDetail, ApplicantRow, ApplicantSkillRow, DashboardRow, EvaluationRow,
};

/// An applicant removed because a newer upload carried the same email.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ReplacedApplicant {
    pub id: Uuid,
    pub resume_key: String,
}

/// Everything the analysis step writes for one applicant.
pub struct AnalysisRecord<'a> {
    pub applicant_id: Uuid,
    pub resume: &'a ParsedResume,
    /// Raw parser JSON, stored verbatim.
    pub parsed_data: &'a Value,
    /// Lowercase, de-duplicated skill names.
    pub skill_names: Vec<String>,
    pub skill_confidence: f64,
    pub ranking: Option<&'a Ranking>,
}

/// Writes made by the upload pipeline. `PgApplicantStore` in production.
#[async_trait]
pub trait ApplicantStore: Send + Sync {
    async fn insert_applicant(
        &self,
        id: Uuid,
        job_id: Option<Uuid>,
        resume_key: &str,
        resume_filename: &str,
    ) -> Result<()>;

    /// Returns false if no row existed. Skill links and the evaluation go with it.
    async fn delete_applicant(&self, id: Uuid) -> Result<bool>;

    /// Stores profile, skills and evaluation atomically. When the parsed email
    /// is present, every other applicant with that email is deleted in the
    /// same transaction and returned so the caller can clean up their files.
    async fn save_analysis(&self, record: AnalysisRecord<'_>) -> Result<Vec<ReplacedApplicant>>;
}

#[derive(Clone)]
pub struct PgApplicantStore {
    pool: PgPool,
}

impl PgApplicantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicantStore for PgApplicantStore {
    async fn insert_applicant(
        &self,
        id: Uuid,
        job_id: Option<Uuid>,
        resume_key: &str,
        resume_filename: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applicants (id, job_id, resume_key, resume_filename)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(job_id)
        .bind(resume_key)
        .bind(resume_filename)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_applicant(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM applicants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_analysis(&self, record: AnalysisRecord<'_>) -> Result<Vec<ReplacedApplicant>> {
        let mut tx = self.pool.begin().await?;

        let replaced = match record.resume.email.as_deref() {
            Some(email) => {
                delete_other_applicants_with_email(&mut *tx, record.applicant_id, email).await?
            }
            None => Vec::new(),
        };
        update_applicant_profile(&mut *tx, record.applicant_id, record.resume, record.parsed_data)
            .await?;
        attach_skills(
            &mut *tx,
            record.applicant_id,
            &record.skill_names,
            record.skill_confidence,
        )
        .await?;
        if let Some(ranking) = record.ranking {
            insert_evaluation(&mut *tx, record.applicant_id, ranking).await?;
        }

        tx.commit().await?;
        Ok(replaced)
    }
}

async fn delete_other_applicants_with_email(
    conn: &mut PgConnection,
    keep_id: Uuid,
    email: &str,
) -> Result<Vec<ReplacedApplicant>> {
    Ok(sqlx::query_as::<_, ReplacedApplicant>(
        r#"
        DELETE FROM applicants
        WHERE email = $1 AND id <> $2
        RETURNING id, resume_key
        "#,
    )
    .bind(email)
    .bind(keep_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Writes the parsed profile fields and the raw parser JSON onto the applicant.
async fn update_applicant_profile(
    conn: &mut PgConnection,
    id: Uuid,
    parsed: &ParsedResume,
    parsed_data: &Value,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE applicants
        SET name = $2, email = $3, phone = $4, experience_summary = $5, parsed_data = $6
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(parsed.name.as_deref())
    .bind(parsed.email.as_deref())
    .bind(parsed.phone.as_deref())
    .bind(parsed.experience_summary.as_deref())
    .bind(parsed_data)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Get-or-creates each skill by name and links it to the applicant.
async fn attach_skills(
    conn: &mut PgConnection,
    applicant_id: Uuid,
    names: &[String],
    confidence: f64,
) -> Result<()> {
    for name in names {
        let skill_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO skills (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO applicant_skills (applicant_id, skill_id, confidence)
            VALUES ($1, $2, $3)
            ON CONFLICT (applicant_id, skill_id) DO UPDATE SET confidence = EXCLUDED.confidence
            "#,
        )
        .bind(applicant_id)
        .bind(skill_id)
        .bind(confidence)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_evaluation(
    conn: &mut PgConnection,
    applicant_id: Uuid,
    ranking: &Ranking,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO evaluations (applicant_id, total_score, skill_score, experience_score, reason)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (applicant_id) DO UPDATE
        SET total_score = EXCLUDED.total_score,
            skill_score = EXCLUDED.skill_score,
            experience_score = EXCLUDED.experience_score,
            reason = EXCLUDED.reason
        "#,
    )
    .bind(applicant_id)
    .bind(ranking.total_score)
    .bind(ranking.skill_score)
    .bind(ranking.experience_score)
    .bind(&ranking.reason)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Ranked dashboard: highest total score first, unscored applicants last.
pub async fn list_dashboard(pool: &PgPool, job_id: Option<Uuid>) -> Result<Vec<DashboardRow>> {
    Ok(sqlx::query_as::<_, DashboardRow>(
        r#"
        SELECT a.id, a.name, a.email, a.job_id, j.title AS job_title,
               e.total_score, e.skill_score, e.experience_score, a.created_at
        FROM applicants a
        LEFT JOIN evaluations e ON e.applicant_id = a.id
        LEFT JOIN jobs j ON j.id = a.job_id
        WHERE ($1::uuid IS NULL OR a.job_id = $1)
        ORDER BY e.total_score DESC NULLS LAST, a.created_at DESC
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_applicant(pool: &PgPool, id: Uuid) -> Result<Option<ApplicantRow>> {
    Ok(
        sqlx::query_as::<_, ApplicantRow>("SELECT * FROM applicants WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn get_applicant_detail(pool: &PgPool, id: Uuid) -> Result<Option<ApplicantDetail>> {
    let Some(applicant) = get_applicant(pool, id).await? else {
        return Ok(None);
    };

    let job = match applicant.job_id {
        Some(job_id) => get_job(pool, job_id).await?,
        None => None,
    };

    let skills = sqlx::query_as::<_, ApplicantSkillRow>(
        r#"
        SELECT s.id AS skill_id, s.name, aps.confidence
        FROM applicant_skills aps
        JOIN skills s ON s.id = aps.skill_id
        WHERE aps.applicant_id = $1
        ORDER BY s.name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let evaluation =
        sqlx::query_as::<_, EvaluationRow>("SELECT * FROM evaluations WHERE applicant_id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(Some(ApplicantDetail {
        applicant,
        job,
        skills,
        evaluation,
    }))
}
