//! Agent construction from scenario configuration.
//!
//! A table of constructors keyed by [`AgentKind`] turns each
//! [`AgentConfig`] into an [`Agent`]. Registry order is the order of the
//! configuration list and is the order agents are stepped and persisted in.
//!
//! Random choices made here (transit route assignment for residents without
//! one) draw from a single `StdRng` seeded from the scenario, consumed in
//! registry order, so the same scenario always yields the same agents.

use citylab_types::{AgentConfig, AgentId, AgentKind, CityState, PolicyType};
use citylab_world::CityGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::agent::{Agent, AgentRole};
use crate::error::AgentError;
use crate::orchestrator::Orchestrator;
use crate::persona;
use crate::planner::Planner;
use crate::resident::Resident;
use crate::transit::TransitOperator;

/// Inputs shared by every constructor.
#[derive(Debug, Clone, Copy)]
pub struct AgentSetup<'a> {
    /// The city graph.
    pub graph: &'a CityGraph,
    /// Initial city state.
    pub city: &'a CityState,
    /// Scenario name, for the orchestrator.
    pub scenario_name: &'a str,
    /// Policy under test, for the orchestrator.
    pub policy_type: PolicyType,
    /// Memory entries each agent retains.
    pub memory_capacity: usize,
}

type Constructor =
    fn(&AgentSetup<'_>, &str, &serde_json::Value, &mut StdRng) -> Result<AgentRole, AgentError>;

const CONSTRUCTORS: [(AgentKind, Constructor); 4] = [
    (AgentKind::Resident, build_resident),
    (AgentKind::TransitOperator, build_transit_operator),
    (AgentKind::Planner, build_planner),
    (AgentKind::Orchestrator, build_orchestrator),
];

fn build_resident(
    setup: &AgentSetup<'_>,
    name: &str,
    raw: &serde_json::Value,
    rng: &mut StdRng,
) -> Result<AgentRole, AgentError> {
    let persona = persona::parse_resident(raw)?;
    let routes = &setup.city.transit_routes;
    let transit_route = match &persona.transit_route {
        Some(route) if routes.iter().any(|r| &r.id == route) => Some(route.clone()),
        Some(route) => {
            return Err(AgentError::InvalidPersona {
                kind: AgentKind::Resident,
                reason: format!("transit route {route} is not in service"),
            });
        }
        None if routes.is_empty() => None,
        None => routes
            .get(rng.random_range(0..routes.len()))
            .map(|r| r.id.clone()),
    };
    Resident::new(name, persona, transit_route, setup.graph).map(AgentRole::Resident)
}

fn build_transit_operator(
    setup: &AgentSetup<'_>,
    _name: &str,
    raw: &serde_json::Value,
    _rng: &mut StdRng,
) -> Result<AgentRole, AgentError> {
    let persona = persona::parse(AgentKind::TransitOperator, raw)?;
    TransitOperator::new(persona, setup.city).map(AgentRole::TransitOperator)
}

fn build_planner(
    _setup: &AgentSetup<'_>,
    _name: &str,
    raw: &serde_json::Value,
    _rng: &mut StdRng,
) -> Result<AgentRole, AgentError> {
    let persona = persona::parse(AgentKind::Planner, raw)?;
    Ok(AgentRole::Planner(Planner::new(persona)))
}

fn build_orchestrator(
    setup: &AgentSetup<'_>,
    _name: &str,
    raw: &serde_json::Value,
    _rng: &mut StdRng,
) -> Result<AgentRole, AgentError> {
    let persona = persona::parse(AgentKind::Orchestrator, raw)?;
    Ok(AgentRole::Orchestrator(Orchestrator::new(
        persona,
        setup.scenario_name,
        setup.policy_type,
    )))
}

fn constructor_for(kind: AgentKind) -> Option<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, constructor)| *constructor)
}

/// Build every configured agent, in order.
///
/// # Errors
///
/// Returns [`AgentError::UnknownKind`] for unrecognised kinds and the
/// constructor's error for invalid personas. Construction stops at the first
/// failure.
pub fn build_agents(
    configs: &[AgentConfig],
    seed: u64,
    setup: &AgentSetup<'_>,
) -> Result<Vec<Agent>, AgentError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut agents = Vec::with_capacity(configs.len());
    for (index, config) in configs.iter().enumerate() {
        let kind = AgentKind::from_label(&config.agent_type)
            .ok_or_else(|| AgentError::UnknownKind(config.agent_type.clone()))?;
        let constructor = constructor_for(kind)
            .ok_or_else(|| AgentError::UnknownKind(config.agent_type.clone()))?;
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_{index}", kind.as_str()));
        let role = constructor(setup, &name, &config.persona, &mut rng)?;
        let id = AgentId::mint(index, &name);
        agents.push(Agent::new(
            id,
            name,
            config.persona.clone(),
            role,
            setup.memory_capacity,
        ));
    }
    info!(agents = agents.len(), seed, "agent registry built");
    Ok(agents)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use citylab_types::{CityData, NodeSpec, TransitRoute};
    use citylab_world::seed_city_state;

    use super::*;
    use crate::kpi::aggregate_kpis;

    fn city() -> (CityGraph, CityState) {
        let data = CityData {
            nodes: vec![
                NodeSpec { id: "a".into(), attrs: BTreeMap::new() },
                NodeSpec { id: "b".into(), attrs: BTreeMap::new() },
            ],
            transit_routes: vec![
                TransitRoute { id: "A".into(), name: String::new(), stops: vec!["a".into()] },
                TransitRoute { id: "B".into(), name: String::new(), stops: vec!["b".into()] },
            ],
            ..CityData::default()
        };
        let graph = CityGraph::from_data(&data).unwrap();
        let state = seed_city_state(&data, &graph).unwrap();
        (graph, state)
    }

    fn config(kind: &str, persona: serde_json::Value) -> AgentConfig {
        AgentConfig {
            agent_type: kind.to_owned(),
            name: None,
            persona,
        }
    }

    fn scenario_agents() -> Vec<AgentConfig> {
        vec![
            config("resident", serde_json::json!({"home_location": "a", "work_location": "b"})),
            config("resident", serde_json::json!({"home_location": "b", "preferred_mode": "car"})),
            config("transit_operator", serde_json::json!({"routes": ["A"]})),
            config("planner", serde_json::Value::Null),
            config("orchestrator", serde_json::Value::Null),
        ]
    }

    #[test]
    fn builds_agents_in_order_with_stable_ids() {
        let (graph, city) = city();
        let setup = AgentSetup {
            graph: &graph,
            city: &city,
            scenario_name: "baseline",
            policy_type: PolicyType::General,
            memory_capacity: 1,
        };
        let first = build_agents(&scenario_agents(), 7, &setup).unwrap();
        let second = build_agents(&scenario_agents(), 7, &setup).unwrap();

        let kinds: Vec<AgentKind> = first.iter().map(Agent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                AgentKind::Resident,
                AgentKind::Resident,
                AgentKind::TransitOperator,
                AgentKind::Planner,
                AgentKind::Orchestrator,
            ]
        );
        assert_eq!(first.first().map(Agent::name), Some("resident_0"));
        assert_eq!(first.last().map(Agent::name), Some("orchestrator_4"));
        let ids: Vec<AgentId> = first.iter().map(Agent::id).collect();
        let again: Vec<AgentId> = second.iter().map(Agent::id).collect();
        assert_eq!(ids, again);

        let routes = |agents: &[Agent]| -> Vec<Option<String>> {
            agents
                .iter()
                .filter_map(|a| match a.role() {
                    AgentRole::Resident(r) => Some(r.state().transit_route.clone()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(routes(&first), routes(&second));
        assert!(routes(&first).iter().all(Option::is_some));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let (graph, city) = city();
        let setup = AgentSetup {
            graph: &graph,
            city: &city,
            scenario_name: "baseline",
            policy_type: PolicyType::General,
            memory_capacity: 1,
        };
        let err = build_agents(&[config("mayor", serde_json::Value::Null)], 0, &setup).unwrap_err();
        assert!(matches!(err, AgentError::UnknownKind(ref kind) if kind == "mayor"));
    }

    #[test]
    fn kpis_count_residents_and_modes() {
        let (graph, mut city) = city();
        city.transit_ridership = BTreeMap::from([("A".to_owned(), 3), ("B".to_owned(), 1)]);
        let setup = AgentSetup {
            graph: &graph,
            city: &city,
            scenario_name: "baseline",
            policy_type: PolicyType::General,
            memory_capacity: 1,
        };
        let agents = build_agents(&scenario_agents(), 1, &setup).unwrap();
        let kpis = aggregate_kpis(&agents, &city, 10);
        assert_eq!(kpis.tick, 10);
        assert_eq!(kpis.resident_count, 2);
        assert!((kpis.transit_modal_share - 0.5).abs() < f64::EPSILON);
        assert_eq!(kpis.transit_ridership, 4);
        assert!(kpis.avg_commute_time.abs() < f64::EPSILON);
        assert!((kpis.service_coverage - 1.0).abs() < f64::EPSILON);
    }
}
