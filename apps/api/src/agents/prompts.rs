// Resume agent prompt templates.
// Placeholders in braces are substituted with `fill_template` before the call.

pub const PARSE_SYSTEM: &str = "\
You are an expert Resume Parsing Agent. \
Extract contact details and history exactly as written in the resume. \
You MUST respond with valid JSON only, no markdown fences, no explanations. \
Use null for any field that is not present in the resume.";

pub const PARSE_PROMPT: &str = r#"Extract the following information from the resume text provided below.
Return ONLY a valid JSON object. Do not include any markdown formatting (like ```json).

Fields to extract:
- name (string)
- email (string)
- phone (string)
- experience_summary (string, max 100 words summary)
- skills_raw (list of strings)
- education (list of objects with degree, institution, year)

Resume Text:
{resume_text}"#;

pub const SKILLS_SYSTEM: &str = "\
You are a Skill Extraction Agent. \
Identify technical and soft skills that the resume actually demonstrates. \
You MUST respond with valid JSON only, no markdown fences, no explanations.";

pub const SKILLS_PROMPT: &str = r#"Analyze the resume text and identify technical and soft skills.
Return ONLY a valid JSON object.

Output format:
{
    "tech_skills": ["skill1", "skill2"],
    "soft_skills": ["skill1", "skill2"],
    "confidence_score": 0.0 to 1.0 (float reflecting overall confidence in extraction)
}

Resume Text:
{resume_text}"#;

pub const RANKING_SYSTEM: &str = "\
You are a Ranking Agent. \
Evaluate candidates strictly on the evidence in their resume. \
You MUST respond with valid JSON only, no markdown fences, no explanations.";

pub const RANKING_PROMPT: &str = r#"Evaluate the candidate based on the resume text against the context.
Provide a scoring from 0 to 100 for Total Score, Skill Score, and Experience Score.
Provide a brief reason (2 sentences).

Context: {context}

Resume Text (truncated):
{resume_text}

Return ONLY valid JSON:
{
    "total_score": int,
    "skill_score": int,
    "experience_score": int,
    "reason": "string"
}"#;

/// Ranking context used when the applicant did not apply to a specific job.
pub const GENERAL_ROLE_CONTEXT: &str = "General Software Engineering Role";

/// Substitutes `{name}` placeholders in one pass over `template`.
/// Substituted values are never rescanned, so a resume or job description that
/// happens to contain `{context}` or `{resume_text}` is inserted verbatim.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match vars.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
