//! KPI aggregation over agent states and the current city state.
//!
//! Every indicator is recomputed from scratch on each call. Nothing is
//! carried over between ticks.

use citylab_types::{CityState, KpiSnapshot, TravelMode};

use crate::agent::{Agent, AgentRole};
use crate::resident::ResidentState;

/// Emissions attributed to one minute of car travel.
pub const EMISSIONS_PER_CAR_MINUTE: f64 = 0.2;

/// Commute length that still counts as job access, in minutes.
pub const JOB_ACCESS_MINUTES: f64 = 30.0;

fn share(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

/// Aggregate indicators for `tick`.
///
/// Commute figures only count residents that have travelled at least once.
pub fn aggregate_kpis(agents: &[Agent], city: &CityState, tick: u64) -> KpiSnapshot {
    let residents: Vec<&ResidentState> = agents
        .iter()
        .filter_map(|agent| match agent.role() {
            AgentRole::Resident(resident) => Some(resident.state()),
            AgentRole::TransitOperator(_) | AgentRole::Planner(_) | AgentRole::Orchestrator(_) => {
                None
            }
        })
        .collect();

    let mut resident_count: u32 = 0;
    let mut travellers: u32 = 0;
    let mut transit_users: u32 = 0;
    let mut with_access: u32 = 0;
    let mut commute_total = 0.0;
    let mut emissions_proxy = 0.0;
    for resident in &residents {
        resident_count = resident_count.saturating_add(1);
        if resident.mode == TravelMode::Transit {
            transit_users = transit_users.saturating_add(1);
        }
        if resident.trips == 0 {
            continue;
        }
        travellers = travellers.saturating_add(1);
        commute_total += resident.commute_minutes;
        if resident.commute_minutes <= JOB_ACCESS_MINUTES {
            with_access = with_access.saturating_add(1);
        }
        if resident.mode == TravelMode::Car {
            emissions_proxy += resident.commute_minutes * EMISSIONS_PER_CAR_MINUTE;
        }
    }

    let avg_commute_time = if travellers == 0 {
        0.0
    } else {
        commute_total / f64::from(travellers)
    };
    let commute_time_change_pct = match city.baseline_commute_time {
        Some(baseline) if baseline > 0.0 && travellers > 0 => {
            (avg_commute_time - baseline) / baseline * 100.0
        }
        _ => 0.0,
    };

    KpiSnapshot {
        tick,
        resident_count,
        avg_commute_time,
        commute_time_change_pct,
        transit_modal_share: share(transit_users, resident_count),
        transit_ridership: city
            .transit_ridership
            .values()
            .fold(0_u64, |total, &n| total.saturating_add(u64::from(n))),
        ridership_by_route: city.transit_ridership.clone(),
        emissions_proxy,
        service_coverage: city.service_coverage,
        job_access_30min: share(with_access, travellers),
        equity_index: city.equity_index,
    }
}
