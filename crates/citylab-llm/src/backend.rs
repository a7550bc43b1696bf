//! HTTP backends for reasoning calls.
//!
//! Enum dispatch over the two supported wire protocols. Both send a system
//! and a user message and return the first text block of the reply.

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::LlmError;

/// Upper bound on reply length, in tokens.
const MAX_TOKENS: u32 = 512;

/// An LLM backend.
#[derive(Debug)]
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
}

/// Connection details shared by both protocols.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpBackend {
    fn new(client: reqwest::Client, config: &LlmBackendConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn post(
        &self,
        label: &str,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let response = request
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(format!("{label} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(LlmError::Backend(format!(
                "{label} returned {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("{label} response parse failed: {e}")))
    }
}

impl LlmBackend {
    /// Build a backend from configuration.
    pub fn new(client: reqwest::Client, config: &LlmBackendConfig) -> Self {
        let http = HttpBackend::new(client, config);
        match config.backend_type {
            BackendType::OpenAi => Self::OpenAi(http),
            BackendType::Anthropic => Self::Anthropic(http),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(http) | Self::Anthropic(http) => &http.model,
        }
    }

    /// Send a prompt and return the reply text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        match self {
            Self::OpenAi(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": user}
                    ],
                    "temperature": 0.0,
                    "max_tokens": MAX_TOKENS,
                });
                let request = http
                    .client
                    .post(format!("{}/chat/completions", http.api_url))
                    .header("Authorization", format!("Bearer {}", http.api_key));
                let json = http.post("OpenAI", request, &body).await?;
                extract_openai_content(&json)
            }
            Self::Anthropic(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "max_tokens": MAX_TOKENS,
                    "system": system,
                    "messages": [
                        {"role": "user", "content": user}
                    ]
                });
                let request = http
                    .client
                    .post(format!("{}/messages", http.api_url))
                    .header("x-api-key", &http.api_key)
                    .header("anthropic-version", "2023-06-01");
                let json = http.post("Anthropic", request, &body).await?;
                extract_anthropic_content(&json)
            }
        }
    }
}

/// Text of `choices[0].message.content`.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Parse(String::from(
                "OpenAI response missing choices[0].message.content",
            ))
        })
}

/// Text of the first `text` block in `content`.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("content")
        .and_then(serde_json::Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|block| block.get("text").and_then(serde_json::Value::as_str))
        })
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Parse(String::from("Anthropic response missing a text content block"))
        })
}
