//! Seeding and per-tick updating of the shared [`CityState`].
//!
//! [`seed_city_state`] derives the initial record from city data.
//! [`apply_tick_actions`] is the single writer: the model calls it once per
//! tick with the full, registry-ordered action set.

use std::collections::{BTreeMap, BTreeSet};

use citylab_types::{Action, ActionData, CityData, CityState, TrafficLevel, TravelMode};
use tracing::debug;

use crate::error::WorldError;
use crate::graph::CityGraph;

/// Headway assumed for routes with no configured frequency, in minutes.
pub const DEFAULT_FREQUENCY_MINUTES: u32 = 15;

/// Route id credited with boardings that name no route.
pub const DEFAULT_ROUTE_ID: &str = "default";

/// Equity index used when the city data does not provide one.
pub const DEFAULT_EQUITY_INDEX: f64 = 0.7;

/// Car share of moves at or above which traffic counts as high.
const HIGH_TRAFFIC_CAR_SHARE: f64 = 0.5;

/// Car share of moves below which traffic counts as low.
const LOW_TRAFFIC_CAR_SHARE: f64 = 0.2;

/// Build the initial city state.
///
/// # Errors
///
/// Returns [`WorldError::DuplicateRoute`] or [`WorldError::UnknownStop`]
/// when the transit network does not fit the graph.
pub fn seed_city_state(data: &CityData, graph: &CityGraph) -> Result<CityState, WorldError> {
    let mut seen = BTreeSet::new();
    let mut served = BTreeSet::new();
    for route in &data.transit_routes {
        if !seen.insert(route.id.as_str()) {
            return Err(WorldError::DuplicateRoute(route.id.clone()));
        }
        for stop in &route.stops {
            if !graph.contains(stop) {
                return Err(WorldError::UnknownStop {
                    route: route.id.clone(),
                    stop: stop.clone(),
                });
            }
            served.insert(stop.as_str());
        }
    }

    let mut transit_frequencies = data.transit_frequencies.clone();
    for route in &data.transit_routes {
        transit_frequencies
            .entry(route.id.clone())
            .or_insert(DEFAULT_FREQUENCY_MINUTES);
    }

    let service_coverage = data
        .indicators
        .get("service_coverage")
        .copied()
        .unwrap_or_else(|| coverage_share(served.len(), graph.node_count()));

    Ok(CityState {
        transit_routes: data.transit_routes.clone(),
        transit_delays: data
            .transit_routes
            .iter()
            .map(|route| (route.id.clone(), 0.0))
            .collect(),
        traffic_level: TrafficLevel::Normal,
        transit_ridership: BTreeMap::new(),
        transit_frequencies,
        service_coverage,
        equity_index: data
            .indicators
            .get("equity_index")
            .copied()
            .unwrap_or(DEFAULT_EQUITY_INDEX),
        baseline_commute_time: data.indicators.get("baseline_commute_time").copied(),
        indicators: data.indicators.clone(),
        metrics: None,
    })
}

fn coverage_share(served: usize, total: usize) -> f64 {
    let (Ok(served), Ok(total)) = (u32::try_from(served), u32::try_from(total)) else {
        return 0.0;
    };
    if total == 0 {
        return 0.0;
    }
    f64::from(served) / f64::from(total)
}

/// What one update pass changed, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickUpdate {
    /// Transit boardings tallied this tick.
    pub boardings: u32,
    /// Moves of any mode this tick.
    pub moves: u32,
    /// Frequency changes applied.
    pub frequency_changes: u32,
}

/// Apply one tick's actions to the city state.
///
/// Ridership is replaced by this tick's tally of transit moves per route.
/// Frequency adjustments overwrite the route's headway, later actions in
/// registry order winning. Traffic follows the share of car moves; a tick
/// with no moves leaves it unchanged.
///
/// # Errors
///
/// Returns [`WorldError::ArithmeticOverflow`] if a counter overflows.
pub fn apply_tick_actions(
    state: &mut CityState,
    actions: &[Action],
) -> Result<TickUpdate, WorldError> {
    let mut ridership: BTreeMap<String, u32> = BTreeMap::new();
    let mut update = TickUpdate::default();
    let mut car_moves: u32 = 0;

    for action in actions {
        match &action.action_data {
            ActionData::Move { mode, route_id, .. } => {
                update.moves = update.moves.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                match mode {
                    TravelMode::Transit => {
                        let route = route_id.as_deref().unwrap_or(DEFAULT_ROUTE_ID);
                        let count = ridership.entry(route.to_owned()).or_insert(0);
                        *count = count.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                        update.boardings = update
                            .boardings
                            .checked_add(1)
                            .ok_or(WorldError::ArithmeticOverflow)?;
                    }
                    TravelMode::Car => {
                        car_moves = car_moves.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                    }
                    TravelMode::Walk | TravelMode::Bike => {}
                }
            }
            ActionData::AdjustFrequency {
                route_id: Some(route),
                new_frequency: Some(frequency),
            } => {
                state.transit_frequencies.insert(route.clone(), *frequency);
                update.frequency_changes = update
                    .frequency_changes
                    .checked_add(1)
                    .ok_or(WorldError::ArithmeticOverflow)?;
            }
            _ => {}
        }
    }

    state.transit_ridership = ridership;
    if update.moves > 0 {
        let car_share = f64::from(car_moves) / f64::from(update.moves);
        state.traffic_level = if car_share >= HIGH_TRAFFIC_CAR_SHARE {
            TrafficLevel::High
        } else if car_share < LOW_TRAFFIC_CAR_SHARE {
            TrafficLevel::Low
        } else {
            TrafficLevel::Normal
        };
    }

    debug!(
        boardings = update.boardings,
        moves = update.moves,
        frequency_changes = update.frequency_changes,
        "city state updated"
    );
    Ok(update)
}
