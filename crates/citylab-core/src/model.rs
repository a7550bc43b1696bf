//! The city model: owns the graph, the city state, and the agent registry,
//! and executes one tick transition at a time.
//!
//! Each call to [`CityModel::step`] runs these phases:
//!
//! 1. **Environment** -- build the tick-start snapshot: simulated time,
//!    hour and day, a shared read-only view of the city state, and every
//!    agent's position and state.
//!
//! 2. **Retrieval** -- ask the [`DocumentRetriever`] for each agent's
//!    documents. A failed retrieval gives that agent an empty list.
//!
//! 3. **Stepping** -- step every agent against the same environment, up to
//!    `max_concurrent_agents` at a time. Results are collected in registry
//!    order. A failed step becomes an `error` action for that agent only.
//!
//! 4. **Update** -- apply the tick's actions to the city state. This is the
//!    only place the city state is written.
//!
//! 5. **KPIs** -- when an orchestrator is registered, aggregate KPIs into
//!    `CityState::metrics` and hand them to the orchestrator.
//!
//! 6. **Advance** -- increment the tick counter.

use std::sync::Arc;
use std::time::Duration;

use citylab_agents::{
    Agent, AgentError, AgentRuntime, AgentSetup, DocumentRetriever, Environment, PromptEngine,
    ReasoningProvider, aggregate_kpis, build_agents,
};
use citylab_types::{
    Action, AgentKind, CityData, CityEvent, CityState, KpiSnapshot, RetrievedDocument,
    ScenarioConfig, StateSnapshot,
};
use citylab_world::{CityGraph, TickUpdate, WorldError, apply_tick_actions, seed_city_state};
use futures::StreamExt;
use futures::stream;
use tracing::{debug, error, info, warn};

use crate::clock::SimulationClock;
use crate::config::CityLabConfig;

/// Errors raised by the city model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Graph construction or a state update failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Agent construction or snapshotting failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The tick counter would overflow.
    #[error("tick counter overflow")]
    TickOverflow,
}

/// Knobs for building and stepping a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    /// Tick-to-time mapping.
    pub clock: SimulationClock,
    /// Agents stepped concurrently within a tick.
    pub max_concurrent_agents: usize,
    /// Memory entries each agent retains.
    pub memory_capacity: usize,
    /// Documents requested per agent per tick.
    pub retrieval_limit: usize,
    /// Deadline for each reasoning call.
    pub reasoning_timeout: Duration,
}

impl ModelOptions {
    /// Options taken from configuration.
    pub const fn from_config(config: &CityLabConfig) -> Self {
        Self {
            clock: SimulationClock::new(config.simulation.start_time),
            max_concurrent_agents: config.simulation.max_concurrent_agents,
            memory_capacity: config.simulation.memory_capacity,
            retrieval_limit: config.retrieval.limit,
            reasoning_timeout: config.reasoning.timeout(),
        }
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self::from_config(&CityLabConfig::default())
    }
}

/// External services the agents consult.
#[derive(Clone)]
pub struct Collaborators {
    /// Reasoning provider; `None` means fallback rules only.
    pub provider: Option<Arc<dyn ReasoningProvider>>,
    /// Document retriever.
    pub retriever: Arc<dyn DocumentRetriever>,
    /// Prompt templates.
    pub prompts: Arc<PromptEngine>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of one tick transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// One action per agent, in registry order.
    pub actions: Vec<Action>,
    /// What the update phase changed.
    pub update: TickUpdate,
    /// KPIs aggregated this tick, if an orchestrator is registered.
    pub kpis: Option<KpiSnapshot>,
}

/// The simulated city for one run.
pub struct CityModel {
    tick: u64,
    city: Arc<CityState>,
    agents: Vec<Agent>,
    events: Vec<CityEvent>,
    runtime: AgentRuntime,
    retriever: Arc<dyn DocumentRetriever>,
    options: ModelOptions,
}

impl std::fmt::Debug for CityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityModel")
            .field("tick", &self.tick)
            .field("agents", &self.agents.len())
            .field("runtime", &self.runtime)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CityModel {
    /// Build the graph, seed the city state, and construct every agent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::World`] for invalid city data and
    /// [`ModelError::Agent`] for unknown agent kinds or invalid personas.
    pub fn new(
        scenario: &ScenarioConfig,
        city_data: &CityData,
        options: ModelOptions,
        collaborators: Collaborators,
    ) -> Result<Self, ModelError> {
        let graph = CityGraph::from_data(city_data)?;
        let city = seed_city_state(city_data, &graph)?;
        let agents = build_agents(
            &scenario.agents,
            scenario.seed,
            &AgentSetup {
                graph: &graph,
                city: &city,
                scenario_name: &scenario.name,
                policy_type: scenario.policy_type,
                memory_capacity: options.memory_capacity,
            },
        )?;

        info!(
            scenario = %scenario.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            agents = agents.len(),
            "City model built"
        );

        Ok(Self {
            tick: 0,
            city: Arc::new(city),
            agents,
            events: Vec::new(),
            runtime: AgentRuntime {
                provider: collaborators.provider,
                prompts: collaborators.prompts,
                graph: Arc::new(graph),
                reasoning_timeout: options.reasoning_timeout,
            },
            retriever: collaborators.retriever,
            options,
        })
    }

    /// The next tick to execute; equals the number of ticks executed.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current city state.
    pub fn city_state(&self) -> &CityState {
        &self.city
    }

    /// The agent registry, in insertion order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The city graph.
    pub fn graph(&self) -> &CityGraph {
        &self.runtime.graph
    }

    /// Tick-to-time mapping.
    pub const fn clock(&self) -> &SimulationClock {
        &self.options.clock
    }

    /// Whether the registry contains an orchestrator.
    pub fn has_orchestrator(&self) -> bool {
        self.agents
            .iter()
            .any(|agent| agent.kind() == AgentKind::Orchestrator)
    }

    /// Tick-start environment for the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Agent`] if an agent's state cannot be
    /// serialized.
    pub fn environment(&self) -> Result<Environment, ModelError> {
        let agents = self
            .agents
            .iter()
            .map(Agent::presence)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Environment {
            tick: self.tick,
            simulation_time: self.options.clock.time_at(self.tick),
            hour: SimulationClock::hour(self.tick),
            day: SimulationClock::day(self.tick),
            city_state: Arc::clone(&self.city),
            agents,
            events: self.events.clone(),
        })
    }

    /// Execute one tick transition.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Agent`] if the environment cannot be built,
    /// [`ModelError::World`] if the update phase fails, and
    /// [`ModelError::TickOverflow`] if the counter cannot advance. Agent
    /// step failures are not errors; they become `error` actions.
    pub async fn step(&mut self) -> Result<TickSummary, ModelError> {
        let tick = self.tick;
        let concurrency = self.options.max_concurrent_agents.max(1);
        let env = self.environment()?;

        let documents: Vec<Vec<RetrievedDocument>> = stream::iter(&self.agents)
            .map(|agent| self.documents_for(agent, &env))
            .buffered(concurrency)
            .collect()
            .await;

        let runtime = &self.runtime;
        let env_ref = &env;
        let actions: Vec<Action> = stream::iter(self.agents.iter_mut().zip(&documents))
            .map(|(agent, docs)| async move {
                match agent.step(env_ref, docs, runtime).await {
                    Ok(action) => action,
                    Err(err) => {
                        error!(
                            tick,
                            agent_id = %agent.id(),
                            kind = agent.kind().as_str(),
                            %err,
                            "Agent step failed"
                        );
                        Action::error(agent.id(), tick, err.to_string())
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;
        drop(env);

        let city = Arc::make_mut(&mut self.city);
        let update = apply_tick_actions(city, &actions)?;

        let kpis = if self.has_orchestrator() {
            let kpis = aggregate_kpis(&self.agents, &self.city, tick);
            Arc::make_mut(&mut self.city).metrics = Some(kpis.clone());
            for agent in &mut self.agents {
                agent.record_kpis(&kpis);
            }
            Some(kpis)
        } else {
            None
        };

        self.tick = tick.checked_add(1).ok_or(ModelError::TickOverflow)?;

        debug!(
            tick,
            actions = actions.len(),
            moves = update.moves,
            boardings = update.boardings,
            frequency_changes = update.frequency_changes,
            "Tick completed"
        );

        Ok(TickSummary {
            tick,
            actions,
            update,
            kpis,
        })
    }

    /// Deep copy of the current state for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Agent`] if an agent's state cannot be
    /// serialized.
    pub fn snapshot(&self) -> Result<StateSnapshot, ModelError> {
        let agent_states = self
            .agents
            .iter()
            .map(Agent::snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StateSnapshot {
            tick: self.tick,
            simulation_time: self.options.clock.time_at(self.tick),
            agent_states,
            city_state: CityState::clone(&self.city),
            events: self.events.clone(),
        })
    }

    async fn documents_for(&self, agent: &Agent, env: &Environment) -> Vec<RetrievedDocument> {
        let perception = agent.perceive(env);
        let Some(query) = agent.retrieval_query(&perception) else {
            return Vec::new();
        };
        let context = serde_json::json!({
            "tick": env.tick,
            "hour": env.hour,
            "day": env.day,
            "location": perception.location,
            "traffic_level": env.city_state.traffic_level,
        });
        match self
            .retriever
            .retrieve(agent.kind(), &query, &context, self.options.retrieval_limit)
            .await
        {
            Ok(docs) => docs,
            Err(err) => {
                warn!(tick = env.tick, agent_id = %agent.id(), %err, "Document retrieval failed");
                Vec::new()
            }
        }
    }
}
