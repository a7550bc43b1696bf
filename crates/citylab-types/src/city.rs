//! City input data and the shared mutable city-state record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TrafficLevel;
use crate::metrics::KpiSnapshot;

/// A graph node as supplied by the city data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodeSpec {
    /// Unique node id.
    pub id: String,
    /// Free-form attributes (coordinates, land use, ...).
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// A street segment as supplied by the city data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EdgeSpec {
    /// Origin node id.
    pub source: String,
    /// Destination node id.
    pub target: String,
    /// Base travel time in minutes.
    pub weight: f64,
    /// Free-form attributes. `oneway: true` makes the edge directed.
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// A transit line serving an ordered list of stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransitRoute {
    /// Route id, e.g. `"A"`.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Node ids served, in order.
    #[serde(default)]
    pub stops: Vec<String>,
}

/// Read-only input describing the city at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CityData {
    /// Graph nodes.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Graph edges.
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    /// Transit routes.
    #[serde(default)]
    pub transit_routes: Vec<TransitRoute>,
    /// Initial headway per route in minutes.
    #[serde(default)]
    pub transit_frequencies: BTreeMap<String, u32>,
    /// Seed infrastructure metrics (`equity_index`, `service_coverage`,
    /// `baseline_commute_time`, ...).
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
}

/// Placeholder for city events; the environment's event list is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CityEvent {
    /// Tick the event occurred on.
    pub tick: u64,
    /// Event category.
    pub kind: String,
    /// Human-readable description.
    pub description: String,
}

/// The shared city record every agent reads each tick.
///
/// Only the model's update phase writes to it, once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CityState {
    /// Transit routes in service.
    pub transit_routes: Vec<TransitRoute>,
    /// Current delay per route in minutes.
    pub transit_delays: BTreeMap<String, f64>,
    /// Road congestion.
    pub traffic_level: TrafficLevel,
    /// Boardings per route during the last tick.
    pub transit_ridership: BTreeMap<String, u32>,
    /// Headway per route in minutes.
    pub transit_frequencies: BTreeMap<String, u32>,
    /// Share of the city served by transit, `[0, 1]`.
    pub service_coverage: f64,
    /// Equity indicator, `[0, 1]`.
    pub equity_index: f64,
    /// Commute time the scenario is compared against.
    pub baseline_commute_time: Option<f64>,
    /// Remaining seed indicators.
    pub indicators: BTreeMap<String, f64>,
    /// Most recent KPI aggregation, present when an orchestrator runs.
    pub metrics: Option<KpiSnapshot>,
}

impl CityState {
    /// Headway of a route, if known.
    pub fn frequency(&self, route_id: &str) -> Option<u32> {
        self.transit_frequencies.get(route_id).copied()
    }

    /// Boardings on a route during the last tick.
    pub fn ridership(&self, route_id: &str) -> u32 {
        self.transit_ridership.get(route_id).copied().unwrap_or(0)
    }
}
