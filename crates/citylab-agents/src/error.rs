//! Error types for the `citylab-agents` crate.
//!
//! [`AgentError`] covers construction and stepping. [`ReasoningError`] and
//! [`RetrievalError`] are returned by the external collaborators; agents
//! recover from both locally and never let them escape a step.

use citylab_types::AgentKind;

/// Errors raised while constructing or stepping an agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The scenario names an agent kind that does not exist.
    #[error("unknown agent kind: {0}")]
    UnknownKind(String),

    /// The persona configuration could not be interpreted.
    #[error("invalid {kind} persona: {reason}")]
    InvalidPersona {
        /// The agent kind being constructed.
        kind: AgentKind,
        /// What was wrong.
        reason: String,
    },

    /// A persona refers to a location that is not on the city graph.
    #[error("agent {agent} refers to unknown location {location}")]
    UnknownLocation {
        /// Agent name.
        agent: String,
        /// The missing node.
        location: String,
    },

    /// No path connects the two locations.
    #[error("no path from {from} to {to}")]
    Unreachable {
        /// Origin node.
        from: String,
        /// Destination node.
        to: String,
    },

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: String,
    },

    /// Agent state could not be serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors returned by a [`ReasoningProvider`](crate::reasoning::ReasoningProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReasoningError {
    /// No provider is configured or it refused the call.
    #[error("reasoning provider unavailable")]
    Unavailable,

    /// The call exceeded its deadline.
    #[error("reasoning call timed out after {millis}ms")]
    Timeout {
        /// The deadline that elapsed.
        millis: u64,
    },

    /// The provider returned an error.
    #[error("reasoning backend error: {0}")]
    Backend(String),

    /// The provider answered with no usable text.
    #[error("reasoning provider returned an empty response")]
    EmptyResponse,
}

/// Errors returned by a [`DocumentRetriever`](crate::retrieval::DocumentRetriever).
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The document corpus could not be read.
    #[error("failed to read document corpus: {0}")]
    Io(#[from] std::io::Error),

    /// The document corpus could not be parsed.
    #[error("failed to parse document corpus: {0}")]
    Parse(#[from] serde_json::Error),

    /// The retrieval backend failed.
    #[error("retrieval backend error: {0}")]
    Backend(String),
}
