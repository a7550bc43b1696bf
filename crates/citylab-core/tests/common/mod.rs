//! Fixtures shared by the engine tests: a four-node city, a scenario with
//! every agent kind, a slow reasoning provider, and a store that fails or
//! cancels on cue.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use citylab_agents::{NoRetrieval, PromptEngine, ReasoningError, ReasoningProvider};
use citylab_core::{Collaborators, RunControl};
use citylab_db::{DbError, MemoryStore, PersistenceStore};
use citylab_types::{
    Action, AgentConfig, AgentDescriptor, CityData, EdgeSpec, NodeSpec, PolicyType, RunId,
    RunMetrics, ScenarioConfig, SimulationRun, StateSnapshot, TransitRoute,
};
use futures::future::BoxFuture;

/// Agents in [`scenario`].
pub const REGISTRY_SIZE: usize = 6;

pub fn city_data() -> CityData {
    let node = |id: &str| NodeSpec {
        id: id.to_owned(),
        attrs: BTreeMap::new(),
    };
    let edge = |source: &str, target: &str, weight: f64| EdgeSpec {
        source: source.to_owned(),
        target: target.to_owned(),
        weight,
        attrs: BTreeMap::new(),
    };
    CityData {
        nodes: vec![node("riverside"), node("hillcrest"), node("central"), node("harbor")],
        edges: vec![
            edge("riverside", "central", 12.0),
            edge("hillcrest", "central", 18.0),
            edge("central", "harbor", 9.0),
            edge("riverside", "hillcrest", 25.0),
        ],
        transit_routes: vec![
            TransitRoute {
                id: String::from("A"),
                name: String::from("River Line"),
                stops: vec![String::from("riverside"), String::from("central")],
            },
            TransitRoute {
                id: String::from("B"),
                name: String::from("Hill Line"),
                stops: vec![
                    String::from("hillcrest"),
                    String::from("central"),
                    String::from("harbor"),
                ],
            },
        ],
        transit_frequencies: BTreeMap::from([(String::from("A"), 10), (String::from("B"), 20)]),
        indicators: BTreeMap::from([(String::from("baseline_commute_time"), 20.0)]),
    }
}

fn agent(kind: &str, persona: serde_json::Value) -> AgentConfig {
    AgentConfig {
        agent_type: kind.to_owned(),
        name: None,
        persona,
    }
}

pub fn agents() -> Vec<AgentConfig> {
    vec![
        agent(
            "resident",
            serde_json::json!({"home_location": "riverside", "work_location": "central"}),
        ),
        agent(
            "resident",
            serde_json::json!({
                "home_location": "hillcrest",
                "work_location": "harbor",
                "preferred_mode": "car",
                "schedule": [{"start_hour": 0, "end_hour": 12, "activity": "work"}],
            }),
        ),
        agent(
            "resident",
            serde_json::json!({
                "home_location": "harbor",
                "work_location": "riverside",
                "schedule": [{"start_hour": 0, "end_hour": 24, "activity": "work"}],
            }),
        ),
        agent(
            "transit_operator",
            serde_json::json!({
                "routes": ["A", "B"],
                "budget": "5000",
                "operating_costs": {"A": "120", "B": "90"},
            }),
        ),
        agent(
            "planner",
            serde_json::json!({"evaluation_criteria": ["equity", "emissions"]}),
        ),
        agent("orchestrator", serde_json::Value::Null),
    ]
}

pub fn scenario(seed: u64) -> ScenarioConfig {
    ScenarioConfig {
        name: String::from("river-line-boost"),
        policy_type: PolicyType::TransitImprovement,
        policy_config: serde_json::json!({"route": "A"}),
        agents: agents(),
        seed,
        simulation_days: 1,
    }
}

pub fn collaborators(provider: Option<Arc<dyn ReasoningProvider>>) -> Collaborators {
    Collaborators {
        provider,
        retriever: Arc::new(NoRetrieval),
        prompts: Arc::new(PromptEngine::builtin().unwrap()),
    }
}

/// Answers every prompt, but only after `delay`.
#[derive(Debug)]
pub struct SlowReasoning {
    pub delay: Duration,
}

impl ReasoningProvider for SlowReasoning {
    fn infer<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> BoxFuture<'a, Result<String, ReasoningError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(String::from("Take the train."))
        })
    }
}

/// Delegates to a [`MemoryStore`]. Rejects the actions of one tick, or
/// cancels the run once the actions of another tick are written.
pub struct ScriptedStore {
    pub inner: Arc<MemoryStore>,
    pub fail_actions_at: Option<u64>,
    pub cancel_after: Option<(u64, RunControl)>,
}

impl ScriptedStore {
    pub const fn failing_at(inner: Arc<MemoryStore>, tick: u64) -> Self {
        Self {
            inner,
            fail_actions_at: Some(tick),
            cancel_after: None,
        }
    }

    pub const fn cancelling_after(inner: Arc<MemoryStore>, tick: u64, control: RunControl) -> Self {
        Self {
            inner,
            fail_actions_at: None,
            cancel_after: Some((tick, control)),
        }
    }
}

impl PersistenceStore for ScriptedStore {
    fn create_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>> {
        self.inner.create_run(run)
    }

    fn update_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>> {
        self.inner.update_run(run)
    }

    fn register_agents<'a>(
        &'a self,
        run_id: RunId,
        agents: &'a [AgentDescriptor],
    ) -> BoxFuture<'a, Result<(), DbError>> {
        self.inner.register_agents(run_id, agents)
    }

    fn append_snapshot<'a>(
        &'a self,
        run_id: RunId,
        snapshot: &'a StateSnapshot,
    ) -> BoxFuture<'a, Result<(), DbError>> {
        self.inner.append_snapshot(run_id, snapshot)
    }

    fn append_actions<'a>(
        &'a self,
        run_id: RunId,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<(), DbError>> {
        let tick = actions.first().map(|action| action.tick);
        if let Some(tick) = tick.filter(|tick| Some(*tick) == self.fail_actions_at) {
            return Box::pin(async move {
                Err(DbError::Rejected(format!("disk full at tick {tick}")))
            });
        }
        if let Some((cancel_tick, control)) = &self.cancel_after {
            if tick == Some(*cancel_tick) {
                control.cancel();
            }
        }
        self.inner.append_actions(run_id, actions)
    }

    fn append_metrics<'a>(&'a self, metrics: &'a RunMetrics) -> BoxFuture<'a, Result<(), DbError>> {
        self.inner.append_metrics(metrics)
    }

    fn close(&self) -> BoxFuture<'_, Result<(), DbError>> {
        self.inner.close()
    }
}
