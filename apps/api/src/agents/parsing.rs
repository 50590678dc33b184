//! Parsing agent: extracts contact details, summary and education from resume text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::agents::prompts::{fill_template, PARSE_PROMPT, PARSE_SYSTEM};
use crate::agents::{lenient_string, lenient_string_list};
use crate::llm_client::{generate_json, LlmError, TextGenerator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub institution: Option<String>,
    /// Models return this as either a number or a string ("2018", "2016-2020").
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
}

/// Typed view of the parsing agent's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub skills_raw: Vec<String>,
    #[serde(default, deserialize_with = "lenient_education")]
    pub education: Vec<Education>,
}

/// Accepts a list of education objects, a single object, or null. A bare string
/// becomes the entry's degree; anything else is dropped.
fn lenient_education<'de, D>(deserializer: D) -> Result<Vec<Education>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        Some(item @ (Value::Object(_) | Value::String(_))) => vec![item],
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value::<Education>(item).ok(),
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| Education {
                    degree: Some(s.to_string()),
                    ..Default::default()
                })
            }
            _ => None,
        })
        .collect())
}

/// Parsed fields plus the raw JSON object, which is stored verbatim as `parsed_data`.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub resume: ParsedResume,
    pub raw: Value,
}

/// Runs the parsing agent. Fails if the call fails or the response is not a JSON object.
pub async fn parse_resume(
    generator: &dyn TextGenerator,
    resume_text: &str,
) -> Result<ParseOutcome, LlmError> {
    let prompt = fill_template(PARSE_PROMPT, &[("{resume_text}", resume_text)]);
    let raw: Value = generate_json(generator, &prompt, PARSE_SYSTEM).await?;
    if !raw.is_object() {
        return Err(LlmError::Parse(serde::de::Error::custom(
            "parsing agent did not return a JSON object",
        )));
    }

    let mut resume: ParsedResume = serde_json::from_value(raw.clone())?;
    resume.email = resume.email.and_then(|e| normalize_email(&e));

    Ok(ParseOutcome { resume, raw })
}

/// Trims and lowercases an address; anything without a single `@` between
/// non-empty parts is dropped.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(email)
}
