//! The simulation run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{PolicyType, RunStatus};
use crate::ids::RunId;
use crate::metrics::KpiSnapshot;
use crate::scenario::ScenarioConfig;

/// One execution of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationRun {
    /// Run id.
    pub id: RunId,
    /// Scenario name.
    pub scenario_name: String,
    /// Policy under test.
    pub policy_type: PolicyType,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Requested horizon in days.
    pub simulation_days: u32,
    /// Seed.
    pub seed: u64,
    /// When the run entered `running`.
    pub start_time: Option<DateTime<Utc>>,
    /// When the run reached a terminal state.
    pub end_time: Option<DateTime<Utc>>,
    /// Failure message for `failed` runs.
    pub error_message: Option<String>,
    /// Final aggregated indicators.
    pub metrics: Option<KpiSnapshot>,
}

impl SimulationRun {
    /// A fresh `pending` run for a scenario.
    pub fn pending(id: RunId, scenario: &ScenarioConfig) -> Self {
        Self {
            id,
            scenario_name: scenario.name.clone(),
            policy_type: scenario.policy_type,
            status: RunStatus::Pending,
            simulation_days: scenario.simulation_days,
            seed: scenario.seed,
            start_time: None,
            end_time: None,
            error_message: None,
            metrics: None,
        }
    }
}
