//! Ranking agent: scores a candidate against a job description (or a general role).

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{
    fill_template, GENERAL_ROLE_CONTEXT, RANKING_PROMPT, RANKING_SYSTEM,
};
use crate::agents::{lenient_f64, lenient_string};
use crate::llm_client::{generate_json, LlmError, TextGenerator};

/// Only this many characters of the resume are sent to the ranking agent.
pub const RANKING_RESUME_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct RankingWire {
    #[serde(default, deserialize_with = "lenient_f64")]
    total_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    skill_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    experience_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: Option<String>,
}

/// Scores are always within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub total_score: i32,
    pub skill_score: i32,
    pub experience_score: i32,
    pub reason: String,
}

impl From<RankingWire> for Ranking {
    fn from(wire: RankingWire) -> Self {
        Self {
            total_score: to_score(wire.total_score),
            skill_score: to_score(wire.skill_score),
            experience_score: to_score(wire.experience_score),
            reason: wire.reason.unwrap_or_default(),
        }
    }
}

fn to_score(value: Option<f64>) -> i32 {
    value.unwrap_or(0.0).round().clamp(0.0, 100.0) as i32
}

/// Builds the ranking context line from an optional job description.
pub fn ranking_context(job_description: &str) -> String {
    let jd = job_description.trim();
    if jd.is_empty() {
        GENERAL_ROLE_CONTEXT.to_string()
    } else {
        format!("Job Description: {jd}")
    }
}

/// First `RANKING_RESUME_CHARS` characters of the resume, split on a char boundary.
pub fn truncate_resume(resume_text: &str) -> &str {
    match resume_text.char_indices().nth(RANKING_RESUME_CHARS) {
        Some((idx, _)) => &resume_text[..idx],
        None => resume_text,
    }
}

pub async fn rank_candidate(
    generator: &dyn TextGenerator,
    resume_text: &str,
    job_description: &str,
) -> Result<Ranking, LlmError> {
    let context = ranking_context(job_description);
    let prompt = fill_template(
        RANKING_PROMPT,
        &[
            ("{context}", context.as_str()),
            ("{resume_text}", truncate_resume(resume_text)),
        ],
    );
    let wire: RankingWire = generate_json(generator, &prompt, RANKING_SYSTEM).await?;
    Ok(wire.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::ScriptedGenerator;

    #[test]
    fn test_context_defaults_to_general_role() {
        assert_eq!(ranking_context("   "), GENERAL_ROLE_CONTEXT);
        assert_eq!(
            ranking_context("Python backend engineer"),
            "Job Description: Python backend engineer"
        );
    }

    #[test]
    fn test_truncate_resume_respects_char_boundaries() {
        let text = "é".repeat(RANKING_RESUME_CHARS + 10);
        let truncated = truncate_resume(&text);
        assert_eq!(truncated.chars().count(), RANKING_RESUME_CHARS);

        assert_eq!(truncate_resume("short"), "short");
    }

    #[test]
    fn test_scores_are_rounded_and_clamped() {
        assert_eq!(to_score(Some(84.6)), 85);
        assert_eq!(to_score(Some(140.0)), 100);
        assert_eq!(to_score(Some(-3.0)), 0);
        assert_eq!(to_score(None), 0);
    }

    #[tokio::test]
    async fn test_rank_candidate_uses_job_description() {
        let generator = ScriptedGenerator::new(
            Err(500),
            Err(500),
            Ok(r#"{"total_score": 82, "skill_score": "90", "experience_score": 74.4, "reason": "Strong Python."}"#),
        );
        let ranking = rank_candidate(&generator, "resume", "Rust engineer")
            .await
            .unwrap();

        assert_eq!(
            ranking,
            Ranking {
                total_score: 82,
                skill_score: 90,
                experience_score: 74,
                reason: "Strong Python.".to_string(),
            }
        );
        assert!(generator.recorded()[0].contains("Context: Job Description: Rust engineer"));
    }

    #[tokio::test]
    async fn test_rank_candidate_only_sends_truncated_resume() {
        let generator = ScriptedGenerator::new(Err(500), Err(500), Ok(r#"{"total_score": 1}"#));
        let resume = format!("{}TAIL-MARKER", "a".repeat(RANKING_RESUME_CHARS));
        rank_candidate(&generator, &resume, "").await.unwrap();

        let prompt = &generator.recorded()[0];
        assert!(!prompt.contains("TAIL-MARKER"));
        assert!(prompt.contains(GENERAL_ROLE_CONTEXT));
    }

    #[tokio::test]
    async fn test_placeholder_in_job_description_is_not_expanded() {
        let generator = ScriptedGenerator::new(Err(500), Err(500), Ok(r#"{"total_score": 50}"#));
        rank_candidate(&generator, "RESUME-BODY", "Paste {resume_text} here")
            .await
            .unwrap();

        let prompt = &generator.recorded()[0];
        assert!(prompt.contains("Job Description: Paste {resume_text} here"));
        assert_eq!(prompt.matches("RESUME-BODY").count(), 1);
    }
}
