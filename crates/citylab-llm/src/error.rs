//! Error types for the reasoning backends.

use citylab_agents::ReasoningError;

/// Errors raised while configuring or calling an LLM backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP request failed or returned a non-success status.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// The response body did not have the expected shape.
    #[error("response parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for ReasoningError {
    fn from(error: LlmError) -> Self {
        Self::Backend(error.to_string())
    }
}
