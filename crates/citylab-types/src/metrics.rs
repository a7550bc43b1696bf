//! Key performance indicators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::RunId;

/// Policy-impact indicators aggregated from the current city state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KpiSnapshot {
    /// Tick the snapshot was computed on.
    pub tick: u64,
    /// Number of residents considered.
    pub resident_count: u32,
    /// Mean of residents' last commute in minutes.
    pub avg_commute_time: f64,
    /// Change against the baseline commute, in percent.
    pub commute_time_change_pct: f64,
    /// Share of residents whose current mode is transit.
    pub transit_modal_share: f64,
    /// Total boardings during the tick.
    pub transit_ridership: u64,
    /// Boardings per route during the tick.
    pub ridership_by_route: BTreeMap<String, u32>,
    /// Car commute minutes weighted by an emissions factor.
    pub emissions_proxy: f64,
    /// Share of the city served by transit.
    pub service_coverage: f64,
    /// Share of residents with a commute of 30 minutes or less.
    pub job_access_30min: f64,
    /// Equity indicator.
    pub equity_index: f64,
}

/// Final metrics row written when a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RunMetrics {
    /// The run the metrics belong to.
    pub run_id: RunId,
    /// Tick the metrics were taken at.
    pub tick: u64,
    /// The indicators.
    pub kpis: KpiSnapshot,
}
