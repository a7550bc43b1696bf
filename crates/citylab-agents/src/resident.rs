//! Resident agents: follow a daily schedule and pick a travel mode.
//!
//! Each tick the resident looks up the activity scheduled for the current
//! hour. If it is already where that activity happens it waits. Otherwise it
//! travels there, asking the reasoning provider which mode to use; when no
//! usable answer comes back it keeps its previous mode.

use citylab_types::{
    ActionData, Activity, AgentKind, CityState, RetrievedDocument, TravelMode,
};
use citylab_world::{CityGraph, DEFAULT_FREQUENCY_MINUTES};
use serde::Serialize;

use crate::agent::{
    AgentRuntime, Decision, DecisionOrigin, FALLBACK_CONFIDENCE, consult_provider,
    prompt_documents,
};
use crate::classify::classify_mode;
use crate::error::AgentError;
use crate::perception::Perception;
use crate::persona::ResidentPersona;

/// Confidence attached to a mode taken from provider text.
const REASONED_CONFIDENCE: f64 = 0.7;

/// Satisfaction before the first trip.
const INITIAL_SATISFACTION: f64 = 0.7;

/// Commute length at which satisfaction bottoms out, in minutes.
const INTOLERABLE_COMMUTE_MINUTES: f64 = 120.0;

/// Lowest satisfaction a long commute can produce.
const MIN_SATISFACTION: f64 = 0.1;

/// Mutable resident state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentState {
    /// Current node.
    pub location: String,
    /// Activity at the current node.
    pub activity: Activity,
    /// Mode of the last (or planned first) trip.
    pub mode: TravelMode,
    /// Transit route this resident rides.
    pub transit_route: Option<String>,
    /// Duration of the last trip in minutes; 0 before the first trip.
    pub commute_minutes: f64,
    /// Trips completed.
    pub trips: u64,
    /// Satisfaction with the last trip, `[0, 1]`.
    pub satisfaction: f64,
}

/// A resident.
#[derive(Debug, Clone)]
pub struct Resident {
    persona: ResidentPersona,
    state: ResidentState,
}

impl Resident {
    /// Create a resident at home.
    ///
    /// `transit_route` is the route the resident rides, already resolved by
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownLocation`] if home or work is not a
    /// graph node.
    pub fn new(
        name: &str,
        persona: ResidentPersona,
        transit_route: Option<String>,
        graph: &CityGraph,
    ) -> Result<Self, AgentError> {
        for location in [persona.home_location.as_str(), persona.work()] {
            if !graph.contains(location) {
                return Err(AgentError::UnknownLocation {
                    agent: name.to_owned(),
                    location: location.to_owned(),
                });
            }
        }
        let state = ResidentState {
            location: persona.home_location.clone(),
            activity: Activity::Home,
            mode: persona.preferred_mode,
            transit_route,
            commute_minutes: 0.0,
            trips: 0,
            satisfaction: INITIAL_SATISFACTION,
        };
        Ok(Self { persona, state })
    }

    /// Current node.
    pub fn location(&self) -> &str {
        &self.state.location
    }

    /// Current state.
    pub const fn state(&self) -> &ResidentState {
        &self.state
    }

    /// Persona.
    pub const fn persona(&self) -> &ResidentPersona {
        &self.persona
    }

    pub(crate) fn retrieval_query(&self, perception: &Perception) -> String {
        let next = self.persona.schedule.activity_at(perception.hour);
        format!("commute to {} by {}", activity_label(next), self.state.mode.as_str())
    }

    pub(crate) async fn reason(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
        runtime: &AgentRuntime,
    ) -> Result<Decision, AgentError> {
        let next = self.persona.schedule.activity_at(perception.hour);
        let destination = self.persona.location_for(next);
        if destination == self.state.location {
            return Ok(Decision::rule(
                ActionData::Wait {
                    reason: format!("already at {}", activity_label(next)),
                },
                format!("Scheduled for {} and already at {destination}", activity_label(next)),
            ));
        }

        let consultation = consult_provider(runtime, AgentKind::Resident, perception, || {
            self.prompt_context(perception, next, destination, docs)
        })
        .await?;

        let (mode, rationale, confidence, origin) = match consultation.reply {
            Some(text) => (
                classify_mode(&text).unwrap_or(self.state.mode),
                text,
                REASONED_CONFIDENCE,
                DecisionOrigin::Reasoning,
            ),
            None => (
                self.state.mode,
                format!(
                    "Continuing by {} to {}",
                    self.state.mode.as_str(),
                    activity_label(next)
                ),
                FALLBACK_CONFIDENCE,
                DecisionOrigin::Fallback,
            ),
        };

        let route_id = match mode {
            TravelMode::Transit => self.state.transit_route.clone(),
            TravelMode::Walk | TravelMode::Bike | TravelMode::Car => None,
        };
        let travel_minutes = travel_minutes(
            &runtime.graph,
            &perception.city_state,
            &self.state.location,
            destination,
            mode,
            route_id.as_deref(),
        )?;

        Ok(Decision {
            action: ActionData::Move {
                destination: destination.to_owned(),
                activity: next,
                mode,
                route_id,
                travel_minutes,
            },
            rationale,
            confidence,
            origin,
            prompt: consultation.prompt,
        })
    }

    pub(crate) fn apply(&mut self, action: &ActionData) {
        if let ActionData::Move {
            destination,
            activity,
            mode,
            travel_minutes,
            ..
        } = action
        {
            self.state.location.clone_from(destination);
            self.state.activity = *activity;
            self.state.mode = *mode;
            self.state.commute_minutes = *travel_minutes;
            self.state.trips = self.state.trips.saturating_add(1);
            self.state.satisfaction = (1.0 - travel_minutes / INTOLERABLE_COMMUTE_MINUTES)
                .clamp(MIN_SATISFACTION, 1.0);
        }
    }

    fn prompt_context(
        &self,
        perception: &Perception,
        next: Activity,
        destination: &str,
        docs: &[RetrievedDocument],
    ) -> serde_json::Value {
        let city = &perception.city_state;
        let route = self.state.transit_route.as_deref();
        let delay = route
            .and_then(|r| city.transit_delays.get(r))
            .copied()
            .unwrap_or(0.0);
        serde_json::json!({
            "tick": perception.tick,
            "hour": perception.hour,
            "day": perception.day,
            "activity": activity_label(self.state.activity),
            "next_activity": activity_label(next),
            "location": self.state.location,
            "destination": destination,
            "mode": self.state.mode.as_str(),
            "commute_minutes": format!("{:.1}", self.state.commute_minutes),
            "satisfaction": format!("{:.2}", self.state.satisfaction),
            "traffic_level": city.traffic_level,
            "routes": city.transit_routes.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            "assigned_route": route,
            "headway": route.and_then(|r| city.frequency(r)),
            "delay": format!("{delay:.1}"),
            "documents": prompt_documents(docs),
        })
    }
}

const fn activity_label(activity: Activity) -> &'static str {
    match activity {
        Activity::Home => "home",
        Activity::Work => "work",
    }
}

/// Door-to-door minutes for a trip.
///
/// Graph travel time scaled by the mode's factor. Transit trips on a known
/// route also wait half a headway on average and absorb the route's delay.
fn travel_minutes(
    graph: &CityGraph,
    city: &CityState,
    from: &str,
    to: &str,
    mode: TravelMode,
    route_id: Option<&str>,
) -> Result<f64, AgentError> {
    let base = graph
        .travel_time(from, to)
        .ok_or_else(|| AgentError::Unreachable {
            from: from.to_owned(),
            to: to.to_owned(),
        })?;
    let mut minutes = base * mode.time_factor();
    if let Some(route) = route_id {
        let headway = city.frequency(route).unwrap_or(DEFAULT_FREQUENCY_MINUTES);
        minutes += f64::from(headway) / 2.0;
        minutes += city.transit_delays.get(route).copied().unwrap_or(0.0);
    }
    Ok(minutes)
}
