use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::AnalyzerConfig;
use crate::features::analysis::clients::{AnalyzerError, DocumentAnalyzer};
use crate::features::analysis::models::AnalysisResult;
use crate::shared::llm::{parse_with_fallback, LlmResponse};
use crate::shared::prompts::{render_document_review_prompt, PromptEngine};

/// Header carrying the API key on every request
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Characters of document text included in debug logs
const LOG_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, empty when absent
    fn reply_text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
            .unwrap_or_default()
    }
}

/// Client for the Gemini `generateContent` API
///
/// The API key is read from the configured environment variable on every
/// call, so a missing key fails the request rather than startup.
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key_env: String,
    prompts: PromptEngine,
    json_schema: String,
}

impl GeminiClient {
    pub fn new(config: &AnalyzerConfig, prompts: PromptEngine) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            prompts,
            json_schema: AnalysisResult::json_schema_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }

    fn api_key(&self) -> Result<String, AnalyzerError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AnalyzerError::MissingCredential(self.api_key_env.clone()))
    }
}

#[async_trait]
impl DocumentAnalyzer for GeminiClient {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalyzerError> {
        let api_key = self.api_key()?;

        tracing::debug!(
            "Sending document to {}: {}...",
            self.model,
            text.chars().take(LOG_PREVIEW_CHARS).collect::<String>()
        );

        let prompt = render_document_review_prompt(&self.prompts, &self.json_schema, text)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach Gemini API: {}", e);
                AnalyzerError::Request(e.to_string())
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|e| {
            tracing::error!("Failed to read Gemini response body: {}", e);
            AnalyzerError::Request(e.to_string())
        })?;

        let parsed = match serde_json::from_str::<GenerateContentResponse>(&raw) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                tracing::error!("Gemini API error: HTTP {}", status);
                return Err(AnalyzerError::Status(status.as_u16()));
            }
            Err(e) => {
                tracing::error!("Failed to parse Gemini response: {}", e);
                return Err(AnalyzerError::InvalidResponse(e.to_string()));
            }
        };

        if let Some(error) = parsed.error {
            let message = error
                .message
                .or(error.status)
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!("Gemini API error: HTTP {} - {}", status, message);
            return Err(AnalyzerError::Api(message));
        }

        if !status.is_success() {
            tracing::error!("Gemini API error: HTTP {}", status);
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let reply = parsed.reply_text();
        tracing::debug!("Received {} characters from {}", reply.len(), self.model);

        let result: AnalysisResult = parse_with_fallback(reply);
        if !result.is_success() {
            tracing::warn!("Model reply was not a JSON object, returning degraded result");
        }

        Ok(result)
    }
}
