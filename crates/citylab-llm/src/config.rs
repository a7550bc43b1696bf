//! Backend configuration loaded from environment variables.
//!
//! A primary backend is required; an escalation backend is optional and is
//! only called when the primary fails.

use crate::error::LlmError;

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// Wire protocol.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl BackendType {
    /// Parse a backend label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

/// Primary and escalation backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Backend tried first.
    pub primary: LlmBackendConfig,
    /// Backend tried when the primary fails.
    pub escalation: Option<LlmBackendConfig>,
}

impl LlmConfig {
    /// Load configuration from the process environment.
    ///
    /// Required: `LLM_DEFAULT_BACKEND`, `LLM_DEFAULT_API_URL`,
    /// `LLM_DEFAULT_API_KEY`, `LLM_DEFAULT_MODEL`. The same four variables
    /// with the `LLM_ESCALATION` prefix configure the optional escalation
    /// backend.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let primary = load_backend_config(&lookup, "LLM_DEFAULT")?;
        let escalation = if lookup("LLM_ESCALATION_BACKEND").is_some() {
            Some(load_backend_config(&lookup, "LLM_ESCALATION")?)
        } else {
            None
        };
        Ok(Self {
            primary,
            escalation,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, LlmError> {
    lookup(name).ok_or_else(|| LlmError::Config(format!("missing required env var {name}")))
}

fn load_backend_config(
    lookup: &impl Fn(&str) -> Option<String>,
    prefix: &str,
) -> Result<LlmBackendConfig, LlmError> {
    let backend_label = required(lookup, &format!("{prefix}_BACKEND"))?;
    let backend_type = BackendType::from_label(&backend_label)
        .ok_or_else(|| LlmError::Config(format!("unknown backend type: {backend_label}")))?;
    Ok(LlmBackendConfig {
        backend_type,
        api_url: required(lookup, &format!("{prefix}_API_URL"))?
            .trim_end_matches('/')
            .to_owned(),
        api_key: required(lookup, &format!("{prefix}_API_KEY"))?,
        model: required(lookup, &format!("{prefix}_MODEL"))?,
    })
}
