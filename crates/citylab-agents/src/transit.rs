//! Transit operator agents: tune headways on the routes they run.
//!
//! Provider text is classified with [`FREQUENCY_RULES`]. An increase shortens
//! the headway of the busiest operated route by two minutes (never below
//! five) and is paid for from the operator's budget. A decrease lengthens the
//! headway of the quietest route by two minutes (never above sixty) and
//! returns the step's cost to the budget. Anything else, including every
//! fallback, leaves service unchanged.
//!
//! [`FREQUENCY_RULES`]: crate::classify::FREQUENCY_RULES

use std::collections::BTreeMap;

use citylab_types::{ActionData, AgentKind, CityState, RetrievedDocument};
use citylab_world::DEFAULT_FREQUENCY_MINUTES;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::agent::{
    AgentRuntime, Decision, DecisionOrigin, FALLBACK_CONFIDENCE, consult_provider,
    prompt_documents,
};
use crate::classify::{FrequencyIntent, classify_frequency};
use crate::error::AgentError;
use crate::perception::Perception;
use crate::persona::TransitOperatorPersona;

/// Shortest headway an operator will schedule, in minutes.
pub const MIN_HEADWAY_MINUTES: u32 = 5;

/// Longest headway an operator will schedule, in minutes.
pub const MAX_HEADWAY_MINUTES: u32 = 60;

/// Minutes added or removed per adjustment.
pub const HEADWAY_STEP_MINUTES: u32 = 2;

/// Confidence attached to adjustments taken from provider text.
const REASONED_CONFIDENCE: f64 = 0.7;

/// Mutable operator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitOperatorState {
    /// Routes operated.
    pub routes: Vec<String>,
    /// Headways as last scheduled by this operator.
    pub frequencies: BTreeMap<String, u32>,
    /// Remaining budget.
    pub budget: Decimal,
    /// Adjustments made.
    pub adjustments: u64,
}

/// A transit operator.
#[derive(Debug, Clone)]
pub struct TransitOperator {
    persona: TransitOperatorPersona,
    state: TransitOperatorState,
}

impl TransitOperator {
    /// Create an operator for the persona's routes, or all city routes when
    /// the persona names none.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidPersona`] if a named route is not in
    /// service.
    pub fn new(persona: TransitOperatorPersona, city: &CityState) -> Result<Self, AgentError> {
        let routes: Vec<String> = if persona.routes.is_empty() {
            city.transit_routes.iter().map(|r| r.id.clone()).collect()
        } else {
            for route in &persona.routes {
                if !city.transit_routes.iter().any(|r| &r.id == route) {
                    return Err(AgentError::InvalidPersona {
                        kind: AgentKind::TransitOperator,
                        reason: format!("route {route} is not in service"),
                    });
                }
            }
            persona.routes.clone()
        };
        let frequencies = routes
            .iter()
            .map(|r| (r.clone(), city.frequency(r).unwrap_or(DEFAULT_FREQUENCY_MINUTES)))
            .collect();
        let state = TransitOperatorState {
            routes,
            frequencies,
            budget: persona.budget,
            adjustments: 0,
        };
        Ok(Self { persona, state })
    }

    /// Current state.
    pub const fn state(&self) -> &TransitOperatorState {
        &self.state
    }

    pub(crate) fn retrieval_query(&self) -> String {
        format!("service levels for routes {}", self.state.routes.join(" "))
    }

    pub(crate) async fn reason(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
        runtime: &AgentRuntime,
    ) -> Result<Decision, AgentError> {
        let consultation = consult_provider(runtime, AgentKind::TransitOperator, perception, || {
            self.prompt_context(perception, docs)
        })
        .await?;

        let Some(text) = consultation.reply else {
            return Ok(Decision {
                action: no_change(),
                rationale: String::from("Keeping current service levels"),
                confidence: FALLBACK_CONFIDENCE,
                origin: DecisionOrigin::Fallback,
                prompt: consultation.prompt,
            });
        };

        let action = classify_frequency(&text)
            .and_then(|intent| self.plan(intent, &perception.city_state))
            .unwrap_or_else(no_change);
        Ok(Decision {
            action,
            rationale: text,
            confidence: REASONED_CONFIDENCE,
            origin: DecisionOrigin::Reasoning,
            prompt: consultation.prompt,
        })
    }

    /// Turn an intent into a concrete adjustment, or `None` when there is
    /// nothing to adjust or the budget cannot pay for it.
    fn plan(&self, intent: FrequencyIntent, city: &CityState) -> Option<ActionData> {
        let (route, new_frequency) = match intent {
            FrequencyIntent::Increase => {
                let route = self.busiest_route(city)?;
                if self.state.budget < self.step_cost(route) {
                    return None;
                }
                let current = city.frequency(route).unwrap_or(DEFAULT_FREQUENCY_MINUTES);
                (
                    route,
                    current
                        .saturating_sub(HEADWAY_STEP_MINUTES)
                        .max(MIN_HEADWAY_MINUTES),
                )
            }
            FrequencyIntent::Decrease => {
                let route = self.quietest_route(city)?;
                let current = city.frequency(route).unwrap_or(DEFAULT_FREQUENCY_MINUTES);
                (
                    route,
                    current
                        .saturating_add(HEADWAY_STEP_MINUTES)
                        .min(MAX_HEADWAY_MINUTES),
                )
            }
        };
        Some(ActionData::AdjustFrequency {
            route_id: Some(route.to_owned()),
            new_frequency: Some(new_frequency),
        })
    }

    /// Route with the most boardings; ties go to the lowest route id.
    fn busiest_route(&self, city: &CityState) -> Option<&str> {
        self.state
            .routes
            .iter()
            .max_by(|a, b| city.ridership(a).cmp(&city.ridership(b)).then_with(|| b.cmp(a)))
            .map(String::as_str)
    }

    /// Route with the fewest boardings; ties go to the lowest route id.
    fn quietest_route(&self, city: &CityState) -> Option<&str> {
        self.state
            .routes
            .iter()
            .min_by(|a, b| city.ridership(a).cmp(&city.ridership(b)).then_with(|| a.cmp(b)))
            .map(String::as_str)
    }

    fn step_cost(&self, route: &str) -> Decimal {
        self.persona
            .operating_costs
            .get(route)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub(crate) fn apply(&mut self, action: &ActionData) -> Result<(), AgentError> {
        let ActionData::AdjustFrequency {
            route_id: Some(route),
            new_frequency: Some(new_frequency),
        } = action
        else {
            return Ok(());
        };
        let previous = self
            .state
            .frequencies
            .get(route)
            .copied()
            .unwrap_or(DEFAULT_FREQUENCY_MINUTES);
        let cost = self.step_cost(route);
        let budget = if *new_frequency < previous {
            self.state.budget.checked_sub(cost)
        } else if *new_frequency > previous {
            self.state.budget.checked_add(cost)
        } else {
            Some(self.state.budget)
        };
        self.state.budget = budget.ok_or_else(|| AgentError::ArithmeticOverflow {
            context: format!("budget after adjusting route {route}"),
        })?;
        self.state.frequencies.insert(route.clone(), *new_frequency);
        self.state.adjustments = self.state.adjustments.saturating_add(1);
        Ok(())
    }

    fn prompt_context(
        &self,
        perception: &Perception,
        docs: &[RetrievedDocument],
    ) -> serde_json::Value {
        let city = &perception.city_state;
        let ridership: Vec<serde_json::Value> = self
            .state
            .routes
            .iter()
            .map(|r| serde_json::json!({"route": r, "riders": city.ridership(r)}))
            .collect();
        let frequencies: Vec<serde_json::Value> = self
            .state
            .routes
            .iter()
            .map(|r| {
                serde_json::json!({
                    "route": r,
                    "minutes": city.frequency(r).unwrap_or(DEFAULT_FREQUENCY_MINUTES),
                })
            })
            .collect();
        serde_json::json!({
            "tick": perception.tick,
            "hour": perception.hour,
            "routes": self.state.routes,
            "ridership": ridership,
            "frequencies": frequencies,
            "budget": self.state.budget.to_string(),
            "service_coverage": format!("{:.2}", city.service_coverage),
            "documents": prompt_documents(docs),
        })
    }
}

const fn no_change() -> ActionData {
    ActionData::AdjustFrequency {
        route_id: None,
        new_frequency: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use citylab_types::{AgentId, TransitRoute};
    use citylab_world::CityGraph;

    use super::*;
    use crate::perception::Environment;
    use crate::prompt::PromptEngine;
    use crate::reasoning::{ReasoningProvider, StaticReasoning};

    fn city() -> CityState {
        let route = |id: &str| TransitRoute {
            id: id.to_owned(),
            name: id.to_owned(),
            stops: Vec::new(),
        };
        CityState {
            transit_routes: vec![route("A"), route("B"), route("C")],
            transit_frequencies: BTreeMap::from([
                ("A".to_owned(), 15),
                ("B".to_owned(), 6),
                ("C".to_owned(), 59),
            ]),
            transit_ridership: BTreeMap::from([("A".to_owned(), 4), ("B".to_owned(), 4)]),
            ..CityState::default()
        }
    }

    fn runtime(reply: &str) -> AgentRuntime {
        let provider: Arc<dyn ReasoningProvider> = Arc::new(StaticReasoning::new(reply));
        AgentRuntime {
            provider: Some(provider),
            prompts: Arc::new(PromptEngine::builtin().unwrap()),
            graph: Arc::new(CityGraph::default()),
            reasoning_timeout: Duration::from_secs(1),
        }
    }

    fn perception(city: CityState) -> Perception {
        Environment {
            tick: 30,
            simulation_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap(),
            hour: 0,
            day: 0,
            city_state: Arc::new(city),
            agents: Vec::new(),
            events: Vec::new(),
        }
        .perceive(AgentId::mint(1, "transit_operator_1"), None)
    }

    fn operator(persona: serde_json::Value) -> TransitOperator {
        let persona = crate::persona::parse(AgentKind::TransitOperator, &persona).unwrap();
        TransitOperator::new(persona, &city()).unwrap()
    }

    #[tokio::test]
    async fn increase_targets_busiest_route_with_lowest_id_on_tie() {
        let op = operator(serde_json::json!({}));
        let decision = op
            .reason(&perception(city()), &[], &runtime("Increase service on the busiest line"))
            .await
            .unwrap();
        assert_eq!(
            decision.action,
            ActionData::AdjustFrequency {
                route_id: Some("A".into()),
                new_frequency: Some(13),
            }
        );
    }

    #[tokio::test]
    async fn increase_never_drops_below_minimum_headway() {
        let op = operator(serde_json::json!({"routes": ["B"]}));
        let decision = op
            .reason(&perception(city()), &[], &runtime("boost it"))
            .await
            .unwrap();
        assert_eq!(
            decision.action,
            ActionData::AdjustFrequency {
                route_id: Some("B".into()),
                new_frequency: Some(MIN_HEADWAY_MINUTES),
            }
        );
    }

    #[tokio::test]
    async fn decrease_targets_quietest_route_and_caps_headway() {
        let op = operator(serde_json::json!({}));
        let decision = op
            .reason(&perception(city()), &[], &runtime("reduce off-peak service"))
            .await
            .unwrap();
        assert_eq!(
            decision.action,
            ActionData::AdjustFrequency {
                route_id: Some("C".into()),
                new_frequency: Some(MAX_HEADWAY_MINUTES),
            }
        );
    }

    #[tokio::test]
    async fn unmatched_text_and_empty_budget_mean_no_change() {
        let op = operator(serde_json::json!({}));
        let decision = op
            .reason(&perception(city()), &[], &runtime("Hold steady."))
            .await
            .unwrap();
        assert_eq!(decision.action, no_change());

        let broke = operator(serde_json::json!({"budget": 10, "operating_costs": {"A": 50}}));
        let decision = broke
            .reason(&perception(city()), &[], &runtime("increase"))
            .await
            .unwrap();
        assert_eq!(decision.action, no_change());
    }

    #[test]
    fn apply_charges_and_refunds_budget() {
        let mut op = operator(serde_json::json!({"budget": 100, "operating_costs": {"A": 30}}));
        op.apply(&ActionData::AdjustFrequency {
            route_id: Some("A".into()),
            new_frequency: Some(13),
        })
        .unwrap();
        assert_eq!(op.state().budget, Decimal::from(70_u32));
        op.apply(&ActionData::AdjustFrequency {
            route_id: Some("A".into()),
            new_frequency: Some(15),
        })
        .unwrap();
        assert_eq!(op.state().budget, Decimal::from(100_u32));
        assert_eq!(op.state().adjustments, 2);

        op.apply(&no_change()).unwrap();
        assert_eq!(op.state().adjustments, 2);
    }

    #[test]
    fn rejects_routes_out_of_service() {
        let persona = crate::persona::parse(
            AgentKind::TransitOperator,
            &serde_json::json!({"routes": ["Z"]}),
        )
        .unwrap();
        assert!(TransitOperator::new(persona, &city()).is_err());
    }
}
