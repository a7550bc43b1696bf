//! Actions: the single committed effect-intent each agent emits per tick.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionType, Activity, PolicyType, TravelMode};
use crate::ids::AgentId;

/// Payload of an [`Action`], one variant per [`ActionType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionData {
    /// A resident travels to the location of its next activity.
    Move {
        /// Destination node id.
        destination: String,
        /// The scheduled activity at the destination.
        activity: Activity,
        /// Chosen travel mode.
        mode: TravelMode,
        /// Transit route ridden, when `mode` is transit.
        route_id: Option<String>,
        /// Estimated door-to-door travel time in minutes.
        travel_minutes: f64,
    },
    /// A transit operator changes a route's headway.
    ///
    /// Both fields are `None` when the operator decided to keep service as is.
    AdjustFrequency {
        /// The route being adjusted.
        route_id: Option<String>,
        /// New headway in minutes.
        new_frequency: Option<u32>,
    },
    /// A planner submits a policy proposal.
    ProposePolicy {
        /// Classified category of the proposal.
        policy_type: PolicyType,
        /// Free-text description.
        description: String,
    },
    /// The orchestrator acknowledges the tick and announces the next one.
    Tick {
        /// Tick number the model advances to.
        next_tick: u64,
        /// Guidance broadcast for the next tick.
        instructions: String,
    },
    /// No effect this tick.
    Wait {
        /// Why the agent is idle.
        reason: String,
    },
    /// The agent's step failed; recorded in place of its intended action.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ActionData {
    /// The discriminant of this payload.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::Move { .. } => ActionType::Move,
            Self::AdjustFrequency { .. } => ActionType::AdjustFrequency,
            Self::ProposePolicy { .. } => ActionType::ProposePolicy,
            Self::Tick { .. } => ActionType::Tick,
            Self::Wait { .. } => ActionType::Wait,
            Self::Error { .. } => ActionType::Error,
        }
    }
}

/// One agent's action for one tick. Append-only once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Action {
    /// The acting agent.
    pub agent_id: AgentId,
    /// The tick during which the action was decided.
    pub tick: u64,
    /// Discriminant of `action_data`.
    pub action_type: ActionType,
    /// The action payload.
    pub action_data: ActionData,
    /// Explanation of the decision (model text or fallback description).
    pub rationale: String,
    /// Ids of documents retrieved for the decision.
    pub retrieved_docs: Vec<String>,
    /// The user prompt sent to the reasoning provider, if one was rendered.
    pub prompt: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Action {
    /// Build the synthetic action recorded when an agent's step fails.
    pub fn error(agent_id: AgentId, tick: u64, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            agent_id,
            tick,
            action_type: ActionType::Error,
            rationale: format!("agent step failed: {message}"),
            action_data: ActionData::Error { message },
            retrieved_docs: Vec::new(),
            prompt: None,
            confidence: 0.0,
        }
    }
}
