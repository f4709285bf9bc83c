use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Gemini `generateContent` client.
/// Authenticates via the `x-goog-api-key` header.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            api_key,
            model,
            base_url,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the text of the first candidate reply.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {url} ({} prompt chars)", prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest::new(prompt))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ServiceUnavailable(body));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status,
                message: body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidPayload(format!("failed to parse response: {e}")))?;

        body.first_text()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Low-temperature, near-deterministic sampling.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_k: 1,
                top_p: 1.0,
                max_output_tokens: 1000,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Result<String, AnalysisError> {
        let candidate = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| AnalysisError::EmptyResponse("no candidates".into()))?;
        let content = candidate
            .content
            .ok_or_else(|| AnalysisError::EmptyResponse("candidate has no content".into()))?;
        let part = content
            .parts
            .and_then(|p| p.into_iter().next())
            .ok_or_else(|| AnalysisError::EmptyResponse("content has no parts".into()))?;
        part.text
            .ok_or_else(|| AnalysisError::EmptyResponse("part has no text".into()))
    }
}
