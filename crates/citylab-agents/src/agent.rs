//! The agent: identity, persona, variant state, and memory.
//!
//! Agent variants form a closed set dispatched through [`AgentRole`]. Every
//! call to [`Agent::step`] runs perceive, reason, and act in order and yields
//! exactly one [`Action`].
//!
//! Reasoning goes through the optional [`ReasoningProvider`] with a deadline.
//! Provider errors and timeouts are logged and replaced by the variant's
//! deterministic fallback rule, so a run with no provider, or a provider that
//! always fails, is fully reproducible.

use std::sync::Arc;
use std::time::Duration;

use citylab_types::{
    Action, ActionData, AgentDescriptor, AgentId, AgentKind, AgentStateSnapshot, KpiSnapshot,
    RetrievedDocument,
};
use citylab_world::CityGraph;
use serde::Serialize;
use tracing::warn;

use crate::error::AgentError;
use crate::memory::{Memory, MemoryEntry};
use crate::orchestrator::Orchestrator;
use crate::perception::{AgentPresence, Environment, Perception};
use crate::planner::Planner;
use crate::prompt::PromptEngine;
use crate::reasoning::{self, ReasoningProvider};
use crate::resident::Resident;
use crate::transit::TransitOperator;

/// Confidence attached to fallback decisions.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Characters of each document included in a prompt.
pub(crate) const DOCUMENT_EXCERPT_CHARS: usize = 200;

/// Documents included in a prompt.
pub(crate) const PROMPT_DOCUMENTS: usize = 3;

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOrigin {
    /// Interpreted from provider text.
    Reasoning,
    /// Provider missing, failed, or timed out.
    Fallback,
    /// No reasoning needed (e.g. already at the destination).
    Rule,
}

/// Output of [`Agent::reason`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// The action to emit.
    pub action: ActionData,
    /// Provider text or fallback description.
    pub rationale: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// How the decision was reached.
    pub origin: DecisionOrigin,
    /// User prompt sent to the provider, if one was sent.
    pub prompt: Option<String>,
}

impl Decision {
    /// A decision that needed no reasoning call.
    pub fn rule(action: ActionData, rationale: impl Into<String>) -> Self {
        Self {
            action,
            rationale: rationale.into(),
            confidence: 1.0,
            origin: DecisionOrigin::Rule,
            prompt: None,
        }
    }
}

/// Shared, run-scoped collaborators for stepping agents.
#[derive(Clone)]
pub struct AgentRuntime {
    /// Reasoning provider. `None` means every agent uses its fallback rule.
    pub provider: Option<Arc<dyn ReasoningProvider>>,
    /// Prompt templates.
    pub prompts: Arc<PromptEngine>,
    /// City graph used for travel times.
    pub graph: Arc<CityGraph>,
    /// Deadline for each reasoning call.
    pub reasoning_timeout: Duration,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("provider", &self.provider.is_some())
            .field("reasoning_timeout", &self.reasoning_timeout)
            .finish_non_exhaustive()
    }
}

/// Result of asking the provider.
pub(crate) struct Consultation {
    /// Provider text, or `None` when the fallback rule applies.
    pub reply: Option<String>,
    /// User prompt sent, if any.
    pub prompt: Option<String>,
}

/// Render the prompt for `kind` and ask the provider, falling back on any
/// reasoning failure.
///
/// The context is built lazily so runs without a provider skip rendering.
pub(crate) async fn consult_provider(
    runtime: &AgentRuntime,
    kind: AgentKind,
    perception: &Perception,
    context: impl FnOnce() -> serde_json::Value,
) -> Result<Consultation, AgentError> {
    let Some(provider) = runtime.provider.as_deref() else {
        return Ok(Consultation {
            reply: None,
            prompt: None,
        });
    };
    let prompt = runtime.prompts.render(kind, &context())?;
    match reasoning::consult(provider, &prompt, runtime.reasoning_timeout).await {
        Ok(text) => Ok(Consultation {
            reply: Some(text),
            prompt: Some(prompt.user),
        }),
        Err(error) => {
            warn!(
                agent_id = %perception.agent_id,
                tick = perception.tick,
                kind = kind.as_str(),
                error = %error,
                "reasoning failed, using fallback rule"
            );
            Ok(Consultation {
                reply: None,
                prompt: Some(prompt.user),
            })
        }
    }
}

/// Documents as template context: top few, content shortened.
pub(crate) fn prompt_documents(docs: &[RetrievedDocument]) -> serde_json::Value {
    docs.iter()
        .take(PROMPT_DOCUMENTS)
        .map(|doc| {
            serde_json::json!({
                "id": doc.id,
                "title": doc.title,
                "document_type": doc.document_type,
                "content": doc.content.chars().take(DOCUMENT_EXCERPT_CHARS).collect::<String>(),
            })
        })
        .collect()
}

/// Variant-specific behaviour and state.
#[derive(Debug, Clone)]
pub enum AgentRole {
    /// A commuter.
    Resident(Resident),
    /// A transit operator.
    TransitOperator(TransitOperator),
    /// A policy planner.
    Planner(Planner),
    /// The tick orchestrator.
    Orchestrator(Orchestrator),
}

impl AgentRole {
    /// The variant's kind.
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Resident(_) => AgentKind::Resident,
            Self::TransitOperator(_) => AgentKind::TransitOperator,
            Self::Planner(_) => AgentKind::Planner,
            Self::Orchestrator(_) => AgentKind::Orchestrator,
        }
    }
}

/// A simulation agent.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    name: String,
    persona: serde_json::Value,
    role: AgentRole,
    memory: Memory,
}

impl Agent {
    /// Assemble an agent from its parts.
    pub fn new(
        id: AgentId,
        name: String,
        persona: serde_json::Value,
        role: AgentRole,
        memory_capacity: usize,
    ) -> Self {
        Self {
            id,
            name,
            persona,
            role,
            memory: Memory::with_capacity(memory_capacity),
        }
    }

    /// Stable identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant.
    pub const fn kind(&self) -> AgentKind {
        self.role.kind()
    }

    /// Variant state.
    pub const fn role(&self) -> &AgentRole {
        &self.role
    }

    /// Persona as configured.
    pub const fn persona(&self) -> &serde_json::Value {
        &self.persona
    }

    /// Recent steps.
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Current node, for residents.
    pub fn location(&self) -> Option<&str> {
        match &self.role {
            AgentRole::Resident(resident) => Some(resident.location()),
            AgentRole::TransitOperator(_) | AgentRole::Planner(_) | AgentRole::Orchestrator(_) => {
                None
            }
        }
    }

    /// Position and state record for the environment.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Serde`] if the state cannot be serialized.
    pub fn presence(&self) -> Result<AgentPresence, AgentError> {
        Ok(AgentPresence {
            agent_id: self.id,
            kind: self.kind(),
            location: self.location().map(str::to_owned),
            state: self.state_value()?,
        })
    }

    /// Query for document retrieval this tick, if the agent wants documents.
    pub fn retrieval_query(&self, perception: &Perception) -> Option<String> {
        match &self.role {
            AgentRole::Resident(resident) => Some(resident.retrieval_query(perception)),
            AgentRole::TransitOperator(operator) => Some(operator.retrieval_query()),
            AgentRole::Planner(planner) => Some(planner.retrieval_query(perception)),
            AgentRole::Orchestrator(_) => None,
        }
    }

    /// Read-only projection of the environment.
    pub fn perceive(&self, env: &Environment) -> Perception {
        env.perceive(self.id, self.location())
    }

    /// Decide what to do. Never fails because of the reasoning provider.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] for failures unrelated to reasoning, such as an
    /// unreachable destination or a template error.
    pub async fn reason(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
        runtime: &AgentRuntime,
    ) -> Result<Decision, AgentError> {
        match &self.role {
            AgentRole::Resident(resident) => resident.reason(perception, docs, runtime).await,
            AgentRole::TransitOperator(operator) => {
                operator.reason(perception, docs, runtime).await
            }
            AgentRole::Planner(planner) => planner.reason(perception, docs, runtime).await,
            AgentRole::Orchestrator(orchestrator) => {
                orchestrator.reason(perception, runtime).await
            }
        }
    }

    /// Commit a decision: update own state, remember the step, and emit the
    /// action.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ArithmeticOverflow`] if a state counter
    /// overflows.
    pub fn act(
        &mut self,
        perception: Perception,
        decision: Decision,
        docs: &[RetrievedDocument],
    ) -> Result<Action, AgentError> {
        match &mut self.role {
            AgentRole::Resident(resident) => resident.apply(&decision.action),
            AgentRole::TransitOperator(operator) => operator.apply(&decision.action)?,
            AgentRole::Planner(planner) => planner.apply(perception.tick, &decision.action),
            AgentRole::Orchestrator(orchestrator) => orchestrator.apply(&decision.action),
        }

        let action = Action {
            agent_id: self.id,
            tick: perception.tick,
            action_type: decision.action.action_type(),
            action_data: decision.action.clone(),
            rationale: decision.rationale.clone(),
            retrieved_docs: docs.iter().map(|doc| doc.id.clone()).collect(),
            prompt: decision.prompt.clone(),
            confidence: decision.confidence,
        };
        self.memory.record(MemoryEntry {
            perception,
            decision,
            action: action.clone(),
        });
        Ok(action)
    }

    /// Perceive, reason, and act. Emits exactly one action on success.
    ///
    /// # Errors
    ///
    /// Propagates [`Agent::reason`] and [`Agent::act`] failures; the caller
    /// records them as an error action.
    pub async fn step(
        &mut self,
        env: &Environment,
        docs: &[RetrievedDocument],
        runtime: &AgentRuntime,
    ) -> Result<Action, AgentError> {
        let perception = self.perceive(env);
        let decision = self.reason(&perception, docs, runtime).await?;
        self.act(perception, decision, docs)
    }

    /// Store the latest KPI aggregation. Only the orchestrator keeps it;
    /// returns whether it was stored.
    pub fn record_kpis(&mut self, kpis: &KpiSnapshot) -> bool {
        match &mut self.role {
            AgentRole::Orchestrator(orchestrator) => {
                orchestrator.record_kpis(kpis.clone());
                true
            }
            AgentRole::Resident(_) | AgentRole::TransitOperator(_) | AgentRole::Planner(_) => {
                false
            }
        }
    }

    /// Variant state as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Serde`] if serialization fails.
    pub fn state_value(&self) -> Result<serde_json::Value, AgentError> {
        let value = match &self.role {
            AgentRole::Resident(resident) => serde_json::to_value(resident.state())?,
            AgentRole::TransitOperator(operator) => serde_json::to_value(operator.state())?,
            AgentRole::Planner(planner) => serde_json::to_value(planner.state())?,
            AgentRole::Orchestrator(orchestrator) => serde_json::to_value(orchestrator.state())?,
        };
        Ok(value)
    }

    /// Owned copy of this agent's state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Serde`] if serialization fails.
    pub fn snapshot(&self) -> Result<AgentStateSnapshot, AgentError> {
        Ok(AgentStateSnapshot {
            agent_id: self.id,
            kind: self.kind(),
            location: self.location().map(str::to_owned),
            state: self.state_value()?,
        })
    }

    /// Registration record.
    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            agent_id: self.id,
            name: self.name.clone(),
            kind: self.kind(),
            persona: self.persona.clone(),
        }
    }
}
