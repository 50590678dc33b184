//! Skill extraction agent: technical and soft skills with an overall confidence.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{fill_template, SKILLS_PROMPT, SKILLS_SYSTEM};
use crate::agents::{lenient_f64, lenient_string_list};
use crate::llm_client::{generate_json, LlmError, TextGenerator};

#[derive(Debug, Deserialize)]
struct SkillsWire {
    #[serde(default, deserialize_with = "lenient_string_list")]
    tech_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    soft_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    confidence_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillExtraction {
    pub tech_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    /// Always within [0.0, 1.0].
    pub confidence_score: f64,
}

impl From<SkillsWire> for SkillExtraction {
    fn from(wire: SkillsWire) -> Self {
        Self {
            tech_skills: wire.tech_skills,
            soft_skills: wire.soft_skills,
            confidence_score: wire.confidence_score.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }
}

impl SkillExtraction {
    /// Lowercased, de-duplicated technical skill names in first-seen order.
    /// This is the form stored in the skills table.
    pub fn normalized_tech_skills(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.tech_skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }
}

pub async fn extract_skills(
    generator: &dyn TextGenerator,
    resume_text: &str,
) -> Result<SkillExtraction, LlmError> {
    let prompt = fill_template(SKILLS_PROMPT, &[("{resume_text}", resume_text)]);
    let wire: SkillsWire = generate_json(generator, &prompt, SKILLS_SYSTEM).await?;
    Ok(wire.into())
}
