use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::parts::{candidate_fragments, concat_fragments};
use super::{CachedCredential, GenerateError, TextGenerator};
use crate::store::postgrest::truncate;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_PROJECT: &str = "sdlc-assist";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

const ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct VertexConfig {
    pub project: String,
    pub location: String,
    pub model: String,
    pub timeout: Duration,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
    /// Replaces `https://{location}-aiplatform.googleapis.com` when set.
    pub base_url: Option<String>,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: None,
            base_url: None,
        }
    }
}

impl VertexConfig {
    #[must_use]
    pub fn endpoint(&self) -> String {
        let base = self.base_url.as_deref().map_or_else(
            || format!("https://{}-aiplatform.googleapis.com", self.location),
            |base| base.trim_end_matches('/').to_string(),
        );
        format!(
            "{base}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.project, self.location, self.model
        )
    }

    fn request_body(&self, system_instruction: &str, user_text: &str) -> Value {
        let mut generation = json!({
            "responseMimeType": "application/json",
            "maxOutputTokens": self.max_output_tokens,
        });
        if let Some(temperature) = self.temperature {
            generation["temperature"] = json!(temperature);
        }
        json!({
            "systemInstruction": {"parts": [{"text": system_instruction}]},
            "contents": [{"role": "user", "parts": [{"text": user_text}]}],
            "generationConfig": generation,
        })
    }
}

/// Calls Vertex AI `generateContent` for a publisher model.
pub struct VertexGenerator {
    config: VertexConfig,
    client: reqwest::Client,
    credential: Arc<CachedCredential>,
}

impl VertexGenerator {
    /// # Errors
    /// Returns `GenerateError::Transport` if the HTTP client cannot be built.
    pub fn new(config: VertexConfig, credential: Arc<CachedCredential>) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            credential,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &VertexConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for VertexGenerator {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> Result<String, GenerateError> {
        let token = self.credential.bearer().await?;
        let body = self.config.request_body(system_instruction, user_text);

        debug!(prompt_chars = user_text.len(), "sending generateContent request");
        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generateContent returned an error");
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_CHARS),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| GenerateError::Decode(err.to_string()))?;
        let (fragments, finish_reason) = candidate_fragments(&payload);
        let text = concat_fragments(&fragments)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse { finish_reason })?;

        debug!(response_chars = text.len(), "generateContent succeeded");
        Ok(text)
    }
}
