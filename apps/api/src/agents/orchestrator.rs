//! Orchestrator: runs the parsing, skill extraction and ranking agents in sequence.
//!
//! The three calls are independent: one failing does not stop the others.
//! Callers decide which results are mandatory (the upload pipeline requires `parsed`).

use serde::Serialize;
use tracing::{info, warn};

use crate::agents::parsing::{parse_resume, ParseOutcome};
use crate::agents::ranking::{rank_candidate, Ranking};
use crate::agents::skills::{extract_skills, SkillExtraction};
use crate::llm_client::TextGenerator;

#[derive(Debug, Clone, Serialize)]
pub struct ResumeAnalysis {
    pub parsed: Option<ParseOutcome>,
    pub skills: Option<SkillExtraction>,
    pub ranking: Option<Ranking>,
}

pub struct Orchestrator<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> Orchestrator<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    pub async fn process_resume(&self, resume_text: &str, job_description: &str) -> ResumeAnalysis {
        // 1. Parse
        let parsed = match parse_resume(self.generator, resume_text).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Parsing agent failed: {e}");
                None
            }
        };

        // 2. Extract skills
        let skills = match extract_skills(self.generator, resume_text).await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Skill extraction agent failed: {e}");
                None
            }
        };

        // 3. Rank
        let ranking = match rank_candidate(self.generator, resume_text, job_description).await {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Ranking agent failed: {e}");
                None
            }
        };

        info!(
            parsed = parsed.is_some(),
            skills = skills.is_some(),
            ranking = ranking.is_some(),
            "Resume analysis complete"
        );

        ResumeAnalysis {
            parsed,
            skills,
            ranking,
        }
    }
}
