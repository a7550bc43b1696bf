//! Scenario input: the immutable bundle describing one policy experiment.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::PolicyType;

/// One entry of a scenario's agent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentConfig {
    /// Agent kind label (`resident`, `transit_operator`, `planner`,
    /// `orchestrator`).
    pub agent_type: String,
    /// Display name. Defaults to `{kind}_{index}`.
    #[serde(default)]
    pub name: Option<String>,
    /// Kind-specific persona, fixed for the agent's lifetime.
    #[serde(default, alias = "persona_config")]
    pub persona: serde_json::Value,
}

/// A policy scenario to simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScenarioConfig {
    /// Scenario name.
    pub name: String,
    /// Category of the policy under test.
    #[serde(default)]
    pub policy_type: PolicyType,
    /// Policy parameters, opaque to the engine.
    #[serde(default)]
    pub policy_config: serde_json::Value,
    /// Agents to instantiate, in registry order.
    #[serde(default, alias = "agents_config")]
    pub agents: Vec<AgentConfig>,
    /// Seed for every random choice made during the run.
    #[serde(default)]
    pub seed: u64,
    /// Horizon in simulated days.
    #[serde(default = "default_simulation_days")]
    pub simulation_days: u32,
}

const fn default_simulation_days() -> u32 {
    1
}
