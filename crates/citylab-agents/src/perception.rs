//! The environment handed to agents and each agent's projection of it.
//!
//! The model builds one [`Environment`] per tick from the tick-start state.
//! City state sits behind an [`Arc`], so agents stepped concurrently share a
//! read-only view and cannot observe each other's in-tick output.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use citylab_types::{AgentId, AgentKind, CityEvent, CityState};

/// An agent as seen at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPresence {
    /// The agent.
    pub agent_id: AgentId,
    /// Its kind.
    pub kind: AgentKind,
    /// Current node, if the agent has one.
    pub location: Option<String>,
    /// Its state bag, serialized.
    pub state: serde_json::Value,
}

/// Tick-start snapshot shared by every agent stepped in the tick.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Tick being executed.
    pub tick: u64,
    /// Simulated wall time of the tick.
    pub simulation_time: DateTime<Utc>,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day index, from 0.
    pub day: u64,
    /// Read-only city state.
    pub city_state: Arc<CityState>,
    /// Every agent's position and state, in registry order.
    pub agents: Vec<AgentPresence>,
    /// Events for the tick. Reserved; currently always empty.
    pub events: Vec<CityEvent>,
}

/// What one agent sees of the environment.
#[derive(Debug, Clone)]
pub struct Perception {
    /// The perceiving agent.
    pub agent_id: AgentId,
    /// Tick being executed.
    pub tick: u64,
    /// Simulated wall time of the tick.
    pub simulation_time: DateTime<Utc>,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day index.
    pub day: u64,
    /// The agent's own node.
    pub location: Option<String>,
    /// Other agents at the same node.
    pub nearby_agents: Vec<AgentId>,
    /// Read-only city state.
    pub city_state: Arc<CityState>,
    /// Events for the tick.
    pub events: Vec<CityEvent>,
}

impl Environment {
    /// Project the environment for `agent_id` standing at `location`.
    pub fn perceive(&self, agent_id: AgentId, location: Option<&str>) -> Perception {
        let nearby_agents = location.map_or_else(Vec::new, |here| {
            self.agents
                .iter()
                .filter(|other| {
                    other.agent_id != agent_id && other.location.as_deref() == Some(here)
                })
                .map(|other| other.agent_id)
                .collect()
        });
        Perception {
            agent_id,
            tick: self.tick,
            simulation_time: self.simulation_time,
            hour: self.hour,
            day: self.day,
            location: location.map(str::to_owned),
            nearby_agents,
            city_state: Arc::clone(&self.city_state),
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn presence(agent_id: AgentId, location: &str) -> AgentPresence {
        AgentPresence {
            agent_id,
            kind: AgentKind::Resident,
            location: Some(location.to_owned()),
            state: serde_json::Value::Null,
        }
    }

    #[test]
    fn nearby_agents_share_the_node_and_exclude_self() {
        let me = AgentId::mint(0, "resident_0");
        let neighbour = AgentId::mint(1, "resident_1");
        let elsewhere = AgentId::mint(2, "resident_2");
        let env = Environment {
            tick: 0,
            simulation_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            hour: 0,
            day: 0,
            city_state: Arc::new(CityState::default()),
            agents: vec![
                presence(me, "a"),
                presence(neighbour, "a"),
                presence(elsewhere, "b"),
            ],
            events: Vec::new(),
        };
        let perception = env.perceive(me, Some("a"));
        assert_eq!(perception.nearby_agents, vec![neighbour]);
        assert!(env.perceive(me, None).nearby_agents.is_empty());
    }
}
