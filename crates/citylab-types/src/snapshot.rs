//! Persisted records derived from live simulation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::city::{CityEvent, CityState};
use crate::enums::AgentKind;
use crate::ids::AgentId;

/// Registration record for an agent, written once when a run initializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentDescriptor {
    /// Stable agent id.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Variant.
    pub kind: AgentKind,
    /// Persona the agent was created with.
    pub persona: serde_json::Value,
}

/// An agent's state at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentStateSnapshot {
    /// Stable agent id.
    pub agent_id: AgentId,
    /// Variant.
    pub kind: AgentKind,
    /// Current node, for agents that have one.
    pub location: Option<String>,
    /// Variant-specific state bag.
    pub state: serde_json::Value,
}

/// Owned copy of the model's state at the start of a tick.
///
/// Holds no references into live containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateSnapshot {
    /// Tick the snapshot was taken before.
    pub tick: u64,
    /// Simulated wall time for the tick.
    pub simulation_time: DateTime<Utc>,
    /// Agent states in registry order.
    pub agent_states: Vec<AgentStateSnapshot>,
    /// City state.
    pub city_state: CityState,
    /// Events recorded for the tick.
    pub events: Vec<CityEvent>,
}
