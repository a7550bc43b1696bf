//! Planner agents: propose policies grounded in retrieved documents.

use std::collections::VecDeque;

use citylab_types::{ActionData, AgentKind, PolicyType, RetrievedDocument};
use serde::Serialize;

use crate::agent::{
    AgentRuntime, Decision, DecisionOrigin, FALLBACK_CONFIDENCE, consult_provider,
    prompt_documents,
};
use crate::classify::classify_policy;
use crate::error::AgentError;
use crate::perception::Perception;
use crate::persona::PlannerPersona;

/// Proposals kept in state; older ones are only in the action log.
pub const RETAINED_PROPOSALS: usize = 32;

/// Confidence attached to proposals taken from provider text.
const REASONED_CONFIDENCE: f64 = 0.8;

/// One recorded proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalRecord {
    /// Tick the proposal was made on.
    pub tick: u64,
    /// Classified category.
    pub policy_type: PolicyType,
    /// Proposal text.
    pub description: String,
}

/// Mutable planner state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlannerState {
    /// Latest proposals, oldest first.
    pub proposals: VecDeque<ProposalRecord>,
    /// Proposals made over the run.
    pub total_proposals: u64,
}

/// A policy planner.
#[derive(Debug, Clone)]
pub struct Planner {
    persona: PlannerPersona,
    state: PlannerState,
}

impl Planner {
    /// Create a planner with no proposals.
    pub fn new(persona: PlannerPersona) -> Self {
        Self {
            persona,
            state: PlannerState::default(),
        }
    }

    /// Current state.
    pub const fn state(&self) -> &PlannerState {
        &self.state
    }

    pub(crate) fn retrieval_query(&self, perception: &Perception) -> String {
        let mut query = format!(
            "policy options for {} traffic",
            perception.city_state.traffic_level.as_str()
        );
        for criterion in &self.persona.evaluation_criteria {
            query.push(' ');
            query.push_str(criterion);
        }
        query
    }

    pub(crate) async fn reason(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
        runtime: &AgentRuntime,
    ) -> Result<Decision, AgentError> {
        let consultation = consult_provider(runtime, AgentKind::Planner, perception, || {
            self.prompt_context(perception, docs)
        })
        .await?;

        Ok(match consultation.reply {
            Some(text) => Decision {
                action: ActionData::ProposePolicy {
                    policy_type: classify_policy(&text),
                    description: text.clone(),
                },
                rationale: text,
                confidence: REASONED_CONFIDENCE,
                origin: DecisionOrigin::Reasoning,
                prompt: consultation.prompt,
            },
            None => Decision {
                action: ActionData::ProposePolicy {
                    policy_type: PolicyType::General,
                    description: String::from("Maintain current policies pending further evidence"),
                },
                rationale: String::from("No reasoning available; defaulting to a general proposal"),
                confidence: FALLBACK_CONFIDENCE,
                origin: DecisionOrigin::Fallback,
                prompt: consultation.prompt,
            },
        })
    }

    pub(crate) fn apply(&mut self, tick: u64, action: &ActionData) {
        if let ActionData::ProposePolicy {
            policy_type,
            description,
        } = action
        {
            if self.state.proposals.len() >= RETAINED_PROPOSALS {
                self.state.proposals.pop_front();
            }
            self.state.proposals.push_back(ProposalRecord {
                tick,
                policy_type: *policy_type,
                description: description.clone(),
            });
            self.state.total_proposals = self.state.total_proposals.saturating_add(1);
        }
    }

    fn prompt_context(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
    ) -> serde_json::Value {
        let city = &perception.city_state;
        serde_json::json!({
            "tick": perception.tick,
            "day": perception.day,
            "hour": perception.hour,
            "traffic_level": city.traffic_level,
            "service_coverage": format!("{:.2}", city.service_coverage),
            "equity_index": format!("{:.2}", city.equity_index),
            "proposals": self.state.total_proposals,
            "criteria": self.persona.evaluation_criteria,
            "regulations": self.persona.regulatory_knowledge,
            "budget_constraints": self.persona.budget_constraints,
            "documents": prompt_documents(docs),
        })
    }
}
