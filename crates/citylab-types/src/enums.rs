//! Enumeration types for the CityLab simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The closed set of agent variants a scenario may instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentKind {
    /// A commuter choosing activities and travel modes.
    Resident,
    /// Operates transit routes and tunes their headways.
    TransitOperator,
    /// Proposes city policies.
    Planner,
    /// Advances tick metadata and triggers KPI aggregation.
    Orchestrator,
}

impl AgentKind {
    /// All variants in registry-construction order.
    pub const ALL: [Self; 4] = [
        Self::Resident,
        Self::TransitOperator,
        Self::Planner,
        Self::Orchestrator,
    ];

    /// The `snake_case` label used in scenario files and persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::TransitOperator => "transit_operator",
            Self::Planner => "planner",
            Self::Orchestrator => "orchestrator",
        }
    }

    /// Parse a scenario label. Returns `None` for unknown kinds.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl core::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a resident is scheduled to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Activity {
    /// At home.
    Home,
    /// At the workplace.
    Work,
}

/// A resident's means of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TravelMode {
    /// On foot.
    Walk,
    /// Bicycle.
    Bike,
    /// Bus, tram, or rail.
    Transit,
    /// Private car.
    Car,
}

impl TravelMode {
    /// The `snake_case` label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Bike => "bike",
            Self::Transit => "transit",
            Self::Car => "car",
        }
    }

    /// Multiplier applied to base graph travel time for this mode.
    pub const fn time_factor(self) -> f64 {
        match self {
            Self::Walk => 4.0,
            Self::Bike => 1.5,
            Self::Transit => 1.2,
            Self::Car => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Category of a policy under test or proposed by a planner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PolicyType {
    /// Road or cordon pricing.
    CongestionPricing,
    /// Transit service or fare improvements.
    TransitImprovement,
    /// Land-use changes.
    ZoningChange,
    /// Cycling lanes and parking.
    BikeInfrastructure,
    /// Anything else.
    #[default]
    General,
}

impl PolicyType {
    /// The `snake_case` label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CongestionPricing => "congestion_pricing",
            Self::TransitImprovement => "transit_improvement",
            Self::ZoningChange => "zoning_change",
            Self::BikeInfrastructure => "bike_infrastructure",
            Self::General => "general",
        }
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Lifecycle state of a simulation run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RunStatus {
    /// Created but not yet initialized.
    #[default]
    Pending,
    /// Initialized and executing ticks.
    Running,
    /// All ticks executed and final metrics written.
    Completed,
    /// Aborted by an error after initialization.
    Failed,
    /// Stopped on request between ticks.
    Cancelled,
}

impl RunStatus {
    /// The `snake_case` label stored in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Actions and city state
// ---------------------------------------------------------------------------

/// Discriminant of an [`ActionData`](crate::ActionData) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionType {
    /// Travel to a destination.
    Move,
    /// Change a route's headway.
    AdjustFrequency,
    /// Submit a policy proposal.
    ProposePolicy,
    /// Orchestrator tick bookkeeping.
    Tick,
    /// Do nothing this tick.
    Wait,
    /// The agent's step failed.
    Error,
}

impl ActionType {
    /// The `snake_case` label stored in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::AdjustFrequency => "adjust_frequency",
            Self::ProposePolicy => "propose_policy",
            Self::Tick => "tick",
            Self::Wait => "wait",
            Self::Error => "error",
        }
    }
}

/// Coarse road congestion level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TrafficLevel {
    /// Free-flowing.
    Low,
    /// Typical conditions.
    #[default]
    Normal,
    /// Congested.
    High,
}

impl TrafficLevel {
    /// The `snake_case` label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_labels_parse_back() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::from_label(kind.as_str()), Some(kind));
        }
        assert_eq!(AgentKind::from_label(" Transit_Operator "), Some(AgentKind::TransitOperator));
        assert_eq!(AgentKind::from_label("mayor"), None);
    }

    #[test]
    fn serde_labels_match_as_str() {
        let json = serde_json::to_string(&PolicyType::BikeInfrastructure).unwrap_or_default();
        assert_eq!(json, "\"bike_infrastructure\"");
        let json = serde_json::to_string(&RunStatus::Cancelled).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", RunStatus::Cancelled.as_str()));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }
}
