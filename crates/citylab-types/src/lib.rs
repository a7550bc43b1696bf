//! Shared type definitions for the CityLab policy simulation.
//!
//! Every crate in the workspace speaks these types. They are also exported
//! to `TypeScript` via `ts-rs` for the results dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Agent and run identifiers
//! - [`enums`] -- Agent kinds, travel modes, policy categories, statuses
//! - [`actions`] -- The per-tick action record and its payloads
//! - [`city`] -- City input data and the shared city-state record
//! - [`documents`] -- Policy documents used as reasoning context
//! - [`metrics`] -- KPI snapshots and final run metrics
//! - [`scenario`] -- Scenario and agent configuration
//! - [`snapshot`] -- Persisted state snapshots
//! - [`run`] -- The run record

pub mod actions;
pub mod city;
pub mod documents;
pub mod enums;
pub mod ids;
pub mod metrics;
pub mod run;
pub mod scenario;
pub mod snapshot;

pub use actions::{Action, ActionData};
pub use city::{CityData, CityEvent, CityState, EdgeSpec, NodeSpec, TransitRoute};
pub use documents::{PolicyDocument, RetrievedDocument};
pub use enums::{ActionType, Activity, AgentKind, PolicyType, RunStatus, TrafficLevel, TravelMode};
pub use ids::{AgentId, RunId};
pub use metrics::{KpiSnapshot, RunMetrics};
pub use run::SimulationRun;
pub use scenario::{AgentConfig, ScenarioConfig};
pub use snapshot::{AgentDescriptor, AgentStateSnapshot, StateSnapshot};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Writes the TypeScript definitions to `bindings/`.
        use ts_rs::TS;

        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::RunId::export_all();

        let _ = crate::enums::AgentKind::export_all();
        let _ = crate::enums::Activity::export_all();
        let _ = crate::enums::TravelMode::export_all();
        let _ = crate::enums::PolicyType::export_all();
        let _ = crate::enums::RunStatus::export_all();
        let _ = crate::enums::ActionType::export_all();
        let _ = crate::enums::TrafficLevel::export_all();

        let _ = crate::actions::ActionData::export_all();
        let _ = crate::actions::Action::export_all();
        let _ = crate::city::CityData::export_all();
        let _ = crate::city::CityState::export_all();
        let _ = crate::documents::RetrievedDocument::export_all();
        let _ = crate::metrics::KpiSnapshot::export_all();
        let _ = crate::metrics::RunMetrics::export_all();
        let _ = crate::scenario::ScenarioConfig::export_all();
        let _ = crate::snapshot::StateSnapshot::export_all();
        let _ = crate::run::SimulationRun::export_all();
    }
}
