//! Gemini provider
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! The instruction goes in `systemInstruction`; the content and any inline
//! media go in a single user turn.
//!
//! # Authentication
//!
//! The API key is read from `GEMINI_API_KEY` (see [`crate::MtConfig`]) and
//! sent in the `x-goog-api-key` header.
//!
//! # Example
//!
//! ```ignore
//! let config = MtConfig::from_env()?;
//! let provider = GeminiProvider::from_config(&config)?;
//! let reply = provider.generate(&Prompt::new("Translate into French.", "Hello"), None).await?;
//! ```

use crate::config::{DEFAULT_BASE_URL, MtConfig};
use crate::error::{MtError, MtResult};
use crate::provider::{MediaPart, Prompt, TranslationProvider};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

/// Gemini `generateContent` provider
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider for `model` with an explicit API key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: String, model: &str, timeout: Duration) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::Config("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MtError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            client,
        })
    }

    /// Create a provider from configuration; fails if no API key is set
    pub fn from_config(config: &MtConfig) -> MtResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            MtError::Config("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        // The provider's own deadline sits just past the client's so the
        // client reports the timeout.
        let timeout = config.timeout + Duration::from_secs(5);
        Ok(Self::new(api_key, &config.model, timeout)?.with_base_url(&config.base_url))
    }

    /// Point the provider at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Request body for one prompt
    fn request_body(prompt: &Prompt, media: Option<&MediaPart>) -> Value {
        let mut parts = Vec::new();
        if !prompt.content.is_empty() {
            parts.push(json!({ "text": prompt.content }));
        }
        if let Some(media) = media {
            parts.push(json!({
                "inline_data": {
                    "mime_type": media.mime_type,
                    "data": STANDARD.encode(&media.data),
                }
            }));
        }
        if parts.is_empty() {
            parts.push(json!({ "text": "" }));
        }

        json!({
            "systemInstruction": { "parts": [{ "text": prompt.instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": 0.2 }
        })
    }

    /// Concatenated text of the first candidate
    fn extract_text(body: &Value) -> MtResult<String> {
        let Some(candidate) = body["candidates"].as_array().and_then(|c| c.first()) else {
            if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
                return Err(MtError::Provider(format!("Prompt blocked: {}", reason)));
            }
            return Err(MtError::MalformedResponse(
                "missing 'candidates' array".to_string(),
            ));
        };

        // Anything but a natural stop means the text is cut short or withheld.
        match candidate["finishReason"].as_str() {
            None | Some("STOP") => {}
            Some("MAX_TOKENS") => {
                return Err(MtError::MalformedResponse(
                    "reply truncated (finish reason: MAX_TOKENS)".to_string(),
                ));
            }
            Some(reason) => {
                return Err(MtError::Provider(format!(
                    "Generation stopped early (finish reason: {})",
                    reason
                )));
            }
        }

        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            MtError::MalformedResponse("candidate has no content parts".to_string())
        })?;

        Ok(parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .concat())
    }

    /// Map a non-success status to an error
    fn status_error(status: StatusCode, body: &str) -> MtError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                MtError::Authentication(format!("{}: {}", status, message))
            }
            StatusCode::TOO_MANY_REQUESTS => MtError::RateLimited(message),
            _ => MtError::Provider(format!("API error ({}): {}", status, message)),
        }
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslationProvider for GeminiProvider {
    async fn generate(&self, prompt: &Prompt, media: Option<&MediaPart>) -> MtResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&Self::request_body(prompt, media))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MtError::Timeout {
                        millis: self.timeout.as_millis() as u64,
                    }
                } else {
                    MtError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MtError::MalformedResponse(format!("Failed to parse API response: {}", e)))?;
        Self::extract_text(&body)
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}
