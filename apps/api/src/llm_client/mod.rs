/// LLM Client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Generative Language API directly.
/// Text generation, embeddings and model listing all go through this module.
///
/// Retry policy: a quota error on the primary model is retried exactly once with the
/// fallback model. Every other failure is returned to the caller as-is.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GENERATE_CONTENT_METHOD: &str = "generateContent";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Quota exceeded for {model} and fallback {fallback}")]
    QuotaExhausted { model: String, fallback: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True when the provider rejected the call for quota/rate reasons.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            LlmError::Api { status, message } => {
                *status == 429
                    || message.contains("Quota exceeded")
                    || message.contains("RESOURCE_EXHAUSTED")
            }
            LlmError::QuotaExhausted { .. } => true,
            _ => false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// A model advertised by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator seam
// ────────────────────────────────────────────────────────────────────────────

/// Anything that turns a prompt into model text. `LlmClient` in production,
/// canned responders in tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Calls the generator and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn generate_json<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    prompt: &str,
    system: &str,
) -> Result<T, LlmError> {
    let text = generator.generate(prompt, system).await?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(&text).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client shared by all services.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    primary_model: String,
    fallback_model: String,
    embedding_model: String,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        primary_model: String,
        fallback_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            primary_model,
            fallback_model,
            embedding_model,
        }
    }

    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Generates text with the primary model, substituting the fallback model once
    /// if the primary reports a quota error.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        match self.call_model(&self.primary_model, prompt, system).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_quota_exhausted() => {
                warn!(
                    "Quota exceeded for {}. Retrying with fallback {}...",
                    self.primary_model, self.fallback_model
                );
                self.call_model(&self.fallback_model, prompt, system)
                    .await
                    .map_err(|e2| {
                        if e2.is_quota_exhausted() {
                            LlmError::QuotaExhausted {
                                model: self.primary_model.clone(),
                                fallback: self.fallback_model.clone(),
                            }
                        } else {
                            e2
                        }
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Makes a single generateContent call against one model.
    async fn call_model(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part { text: system }],
            }),
        };

        let url = format!("{GEMINI_API_BASE}/models/{model}:{GENERATE_CONTENT_METHOD}");
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let response: GenerateContentResponse = parse_response(response).await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                model, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response.text().ok_or(LlmError::EmptyContent)
    }

    /// Embeds a single text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = &self.embedding_model;
        let request_body = EmbedContentRequest {
            model: format!("models/{model}"),
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(format!("{GEMINI_API_BASE}/models/{model}:embedContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let response: EmbedContentResponse = parse_response(response).await?;
        if response.embedding.values.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response.embedding.values)
    }

    /// Lists every model that supports text generation, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{GEMINI_API_BASE}/models"))
                .header("x-goog-api-key", &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: ListModelsResponse = parse_response(request.send().await?).await?;
            models.extend(page.models.into_iter().filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT_METHOD)
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.call(prompt, system).await
    }
}

/// Maps non-success statuses to `LlmError::Api`, otherwise decodes the JSON body.
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GeminiError>(&body)
            .map(|e| match e.error.status {
                Some(s) => format!("{s}: {}", e.error.message),
                None => e.error.message,
            })
            .unwrap_or(body);
        warn!("Gemini API returned {}: {}", status, message);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

/// Removes every ```json and ``` fence token from LLM output, wherever it appears.
fn strip_json_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_trailing_fence_only() {
        let input = "{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_with_leading_prose() {
        let input = "Here you go:\n```json\n{}\n```";
        assert_eq!(strip_json_fences(input), "Here you go:\n\n{}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_quota_detection_by_status() {
        let err = LlmError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(err.is_quota_exhausted());
    }

    #[test]
    fn test_quota_detection_by_message() {
        let err = LlmError::Api {
            status: 400,
            message: "Quota exceeded for metric generate_content".to_string(),
        };
        assert!(err.is_quota_exhausted());
    }

    #[test]
    fn test_other_api_errors_are_not_quota() {
        let err = LlmError::Api {
            status: 400,
            message: "INVALID_ARGUMENT: bad prompt".to_string(),
        };
        assert!(!err.is_quota_exhausted());
        assert!(!LlmError::EmptyContent.is_quota_exhausted());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_generate_request_serializes_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hi" }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part { text: "be terse" }],
            }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be terse");
        assert!(value["systemInstruction"].get("role").is_none());
    }

    #[tokio::test]
    async fn test_generate_json_strips_fences() {
        let generator = Canned("```json\n{\"total_score\": 80}\n```");
        let value: serde_json::Value = generate_json(&generator, "p", "s").await.unwrap();
        assert_eq!(value["total_score"], 80);
    }

    #[tokio::test]
    async fn test_generate_json_reports_parse_errors() {
        let generator = Canned("Sorry, I cannot help with that.");
        let result: Result<serde_json::Value, _> = generate_json(&generator, "p", "s").await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }
}
