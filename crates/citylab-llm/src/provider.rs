//! [`ReasoningProvider`] over HTTP backends, with escalation on failure.

use citylab_agents::{ReasoningError, ReasoningProvider};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::backend::LlmBackend;
use crate::config::LlmConfig;

/// Reasoning through a primary backend, retried once on the escalation
/// backend when the primary fails.
///
/// The agent-side deadline covers both attempts.
#[derive(Debug)]
pub struct LlmReasoning {
    primary: LlmBackend,
    escalation: Option<LlmBackend>,
}

impl LlmReasoning {
    /// Build both backends over one shared HTTP client.
    pub fn new(config: &LlmConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            primary: LlmBackend::new(client.clone(), &config.primary),
            escalation: config
                .escalation
                .as_ref()
                .map(|escalation| LlmBackend::new(client, escalation)),
        }
    }

    /// Use already-built backends.
    pub const fn from_backends(primary: LlmBackend, escalation: Option<LlmBackend>) -> Self {
        Self {
            primary,
            escalation,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ReasoningError> {
        match self.primary.complete(system, user).await {
            Ok(text) => {
                debug!(
                    backend = self.primary.name(),
                    model = self.primary.model(),
                    "reasoning reply"
                );
                Ok(text)
            }
            Err(error) => {
                let Some(escalation) = &self.escalation else {
                    return Err(error.into());
                };
                warn!(
                    backend = self.primary.name(),
                    error = %error,
                    escalation = escalation.name(),
                    "primary backend failed, escalating"
                );
                escalation
                    .complete(system, user)
                    .await
                    .map_err(ReasoningError::from)
            }
        }
    }
}

impl ReasoningProvider for LlmReasoning {
    fn infer<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, ReasoningError>> {
        Box::pin(self.complete(system, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendType, LlmBackendConfig};

    fn unreachable_backend(backend_type: BackendType) -> LlmBackendConfig {
        LlmBackendConfig {
            backend_type,
            // Port 9 (discard) on loopback refuses connections.
            api_url: String::from("http://127.0.0.1:9"),
            api_key: String::from("test"),
            model: String::from("test-model"),
        }
    }

    #[tokio::test]
    async fn failure_on_both_backends_is_a_backend_error() {
        let config = LlmConfig {
            primary: unreachable_backend(BackendType::OpenAi),
            escalation: Some(unreachable_backend(BackendType::Anthropic)),
        };
        let result = LlmReasoning::new(&config).infer("system", "user").await;
        assert!(matches!(result, Err(ReasoningError::Backend(msg)) if msg.contains("Anthropic")));
    }
}
