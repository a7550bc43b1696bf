//! The external reasoning contract and its in-process implementations.
//!
//! A [`ReasoningProvider`] turns a rendered prompt into free-form decision
//! text. Calls are bounded by a deadline through [`consult`]; any error or
//! timeout sends the agent down its deterministic fallback rule instead.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::ReasoningError;
use crate::prompt::RenderedPrompt;

/// Converts prompt text into decision text.
///
/// Implementations must be shareable across the concurrently stepped agents
/// of a tick.
pub trait ReasoningProvider: Send + Sync {
    /// Run one inference call.
    fn infer<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, ReasoningError>>;
}

/// A provider that always answers with the same text.
///
/// Useful for reproducible runs: every agent sees the same reply and the
/// outcome depends only on the rule tables.
#[derive(Debug, Clone)]
pub struct StaticReasoning {
    reply: String,
}

impl StaticReasoning {
    /// Create a provider returning `reply` for every prompt.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl ReasoningProvider for StaticReasoning {
    fn infer<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> BoxFuture<'a, Result<String, ReasoningError>> {
        Box::pin(async move { Ok(self.reply.clone()) })
    }
}

/// A provider that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableReasoning;

impl ReasoningProvider for UnavailableReasoning {
    fn infer<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> BoxFuture<'a, Result<String, ReasoningError>> {
        Box::pin(async { Err(ReasoningError::Unavailable) })
    }
}

/// Call `provider` with a deadline.
///
/// Blank replies count as [`ReasoningError::EmptyResponse`].
pub async fn consult(
    provider: &dyn ReasoningProvider,
    prompt: &RenderedPrompt,
    deadline: Duration,
) -> Result<String, ReasoningError> {
    match tokio::time::timeout(deadline, provider.infer(&prompt.system, &prompt.user)).await {
        Ok(Ok(text)) if text.trim().is_empty() => Err(ReasoningError::EmptyResponse),
        Ok(result) => result,
        Err(_elapsed) => Err(ReasoningError::Timeout {
            millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
