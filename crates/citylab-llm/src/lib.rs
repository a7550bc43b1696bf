//! LLM-backed reasoning for CityLab agents.
//!
//! Implements the [`ReasoningProvider`](citylab_agents::ReasoningProvider)
//! contract over `OpenAI`-compatible and Anthropic HTTP APIs. Backends are
//! configured from `LLM_DEFAULT_*` and optional `LLM_ESCALATION_*`
//! environment variables.

pub mod backend;
pub mod config;
pub mod error;
pub mod provider;

pub use backend::LlmBackend;
pub use config::{BackendType, LlmBackendConfig, LlmConfig};
pub use error::LlmError;
pub use provider::LlmReasoning;
