//! Generation invoker — the `ContentGenerator` seam and its Gemini client.
//!
//! A client is built once per batch run from the API key and shared by every
//! item; configuration that varies per item (model, temperature) travels with
//! each call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::params::GeminiModel;
use crate::payload::RequestPayload;
use crate::NodeError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Finish reasons the provider SDK treats as a failed response.
const BAD_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "OTHER",
];

/// Something that turns a payload into model text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Send `payload` to `model` and return its primary text output verbatim.
    async fn generate(
        &self,
        model: GeminiModel,
        payload: &RequestPayload,
        temperature: f64,
    ) -> Result<String, NodeError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: &'a RequestPayload,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, NodeError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(NodeError::Generation(format!(
                "Prompt was blocked due to {reason}"
            )));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| NodeError::Generation("Response contained no candidates".into()))?;

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| BAD_FINISH_REASONS.contains(r))
        {
            return Err(NodeError::Generation(format!(
                "Candidate was blocked due to {reason}"
            )));
        }

        Ok(candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Tuning knobs for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Scheme and host of the API, without a trailing path.
    pub base_url: String,
    /// Upper bound on one `generateContent` call.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// REST client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Build a client scoped to `api_key`.
    ///
    /// # Errors
    /// [`NodeError::Config`] when the key is empty or not a valid header value.
    pub fn new(api_key: &str, config: GeminiConfig) -> Result<Self, NodeError> {
        if api_key.trim().is_empty() {
            return Err(NodeError::config("apiKey", "must not be empty"));
        }

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| NodeError::config("apiKey", e.to_string()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::Generation(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn endpoint(&self, model: GeminiModel) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(
        &self,
        model: GeminiModel,
        payload: &RequestPayload,
        temperature: f64,
    ) -> Result<String, NodeError> {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: payload,
            }],
            generation_config: GenerationConfig { temperature },
        };

        let response = self
            .http
            .post(self.endpoint(model))
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::Generation(format!("Error fetching from {model}: {e}")))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| NodeError::Generation(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(NodeError::Generation(format!(
                "Error fetching from {model}: [{status}] {detail}"
            )));
        }

        debug!(%model, bytes = raw.len(), "generateContent response received");

        serde_json::from_str::<GenerateContentResponse>(&raw)
            .map_err(|e| NodeError::Generation(format!("Malformed response from {model}: {e}")))?
            .into_text()
    }
}
