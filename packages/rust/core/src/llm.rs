//! LLM text generation used by the classifier.

use std::time::Duration;

use async_trait::async_trait;
use cookido_shared::{CookidoError, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

/// Public Generative Language API host.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Classification batches can take a while on large models.
const GEMINI_TIMEOUT_SECS: u64 = 120;

/// A single-prompt text generator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(GEMINI_API_BASE)
            .map_err(|e| CookidoError::config(format!("invalid Gemini base URL: {e}")))?;
        Self::with_base_url(api_key, model, base_url)
    }

    /// Client against a non-default host (used by tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Url,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(GEMINI_TIMEOUT_SECS))
            .build()
            .map_err(|e| CookidoError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| CookidoError::config(format!("invalid Gemini model '{}': {e}", self.model)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling Gemini");
        let response = self
            .http
            .post(self.endpoint()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CookidoError::Network(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CookidoError::Network(format!("failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(CookidoError::Api {
                status: status.as_u16(),
                message: format!("Gemini: {message}"),
            });
        }

        extract_text(&body)
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| CookidoError::parse(format!("invalid Gemini response JSON: {e}")))?;

    if let Some(message) = v["error"]["message"].as_str() {
        return Err(CookidoError::Classification(format!("Gemini error: {message}")));
    }

    let text: String = v["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(CookidoError::Classification(
            "Gemini response contained no text".into(),
        ));
    }
    Ok(text)
}
