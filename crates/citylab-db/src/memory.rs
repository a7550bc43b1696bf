//! In-process [`PersistenceStore`] backed by `tokio::sync::Mutex`-guarded
//! collections.
//!
//! Used for runs without a database and by the engine tests, which read the
//! recorded timeline back through the accessors.

use std::collections::BTreeMap;

use citylab_types::{Action, AgentDescriptor, RunId, RunMetrics, SimulationRun, StateSnapshot};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::error::DbError;
use crate::store::PersistenceStore;

#[derive(Debug, Default)]
struct Tables {
    runs: BTreeMap<RunId, SimulationRun>,
    agents: Vec<(RunId, AgentDescriptor)>,
    snapshots: Vec<(RunId, StateSnapshot)>,
    actions: Vec<(RunId, Action)>,
    metrics: Vec<RunMetrics>,
    closed: bool,
}

impl Tables {
    const fn writable(&self) -> Result<(), DbError> {
        if self.closed {
            Err(DbError::Closed)
        } else {
            Ok(())
        }
    }

    fn known(&self, run_id: RunId) -> Result<(), DbError> {
        self.writable()?;
        if self.runs.contains_key(&run_id) {
            Ok(())
        } else {
            Err(DbError::RunNotFound(run_id))
        }
    }
}

/// Persistence held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored run record.
    pub async fn run(&self, run_id: RunId) -> Option<SimulationRun> {
        self.tables.lock().await.runs.get(&run_id).cloned()
    }

    /// Registered agents of a run.
    pub async fn agents(&self, run_id: RunId) -> Vec<AgentDescriptor> {
        self.tables
            .lock()
            .await
            .agents
            .iter()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, agent)| agent.clone())
            .collect()
    }

    /// Snapshots of a run, in append order.
    pub async fn snapshots(&self, run_id: RunId) -> Vec<StateSnapshot> {
        self.tables
            .lock()
            .await
            .snapshots
            .iter()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, snapshot)| snapshot.clone())
            .collect()
    }

    /// Actions of a run, in append order.
    pub async fn actions(&self, run_id: RunId) -> Vec<Action> {
        self.tables
            .lock()
            .await
            .actions
            .iter()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, action)| action.clone())
            .collect()
    }

    /// Metrics rows of a run, in append order.
    pub async fn metrics(&self, run_id: RunId) -> Vec<RunMetrics> {
        self.tables
            .lock()
            .await
            .metrics
            .iter()
            .filter(|row| row.run_id == run_id)
            .cloned()
            .collect()
    }

    /// Whether [`PersistenceStore::close`] has been called.
    pub async fn is_closed(&self) -> bool {
        self.tables.lock().await.closed
    }
}

impl PersistenceStore for MemoryStore {
    fn create_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.writable()?;
            tables.runs.insert(run.id, run.clone());
            Ok(())
        })
    }

    fn update_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.known(run.id)?;
            tables.runs.insert(run.id, run.clone());
            Ok(())
        })
    }

    fn register_agents<'a>(
        &'a self,
        run_id: RunId,
        agents: &'a [AgentDescriptor],
    ) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.known(run_id)?;
            tables
                .agents
                .extend(agents.iter().map(|agent| (run_id, agent.clone())));
            Ok(())
        })
    }

    fn append_snapshot<'a>(
        &'a self,
        run_id: RunId,
        snapshot: &'a StateSnapshot,
    ) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.known(run_id)?;
            tables.snapshots.push((run_id, snapshot.clone()));
            Ok(())
        })
    }

    fn append_actions<'a>(
        &'a self,
        run_id: RunId,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.known(run_id)?;
            tables
                .actions
                .extend(actions.iter().map(|action| (run_id, action.clone())));
            Ok(())
        })
    }

    fn append_metrics<'a>(&'a self, metrics: &'a RunMetrics) -> BoxFuture<'a, Result<(), DbError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            tables.known(metrics.run_id)?;
            tables.metrics.push(metrics.clone());
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), DbError>> {
        Box::pin(async move {
            self.tables.lock().await.closed = true;
            tracing::debug!("memory store closed");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citylab_types::{
        ActionData, AgentId, AgentKind, KpiSnapshot, PolicyType, RunStatus, ScenarioConfig,
    };

    use super::*;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig {
            name: String::from("baseline"),
            policy_type: PolicyType::General,
            policy_config: serde_json::Value::Null,
            agents: Vec::new(),
            seed: 42,
            simulation_days: 1,
        }
    }

    #[tokio::test]
    async fn records_a_run_timeline() {
        let store = MemoryStore::new();
        let mut run = SimulationRun::pending(RunId::new(), &scenario());
        store.create_run(&run).await.unwrap();

        let agent = AgentId::mint(0, "planner_0");
        store
            .register_agents(
                run.id,
                &[AgentDescriptor {
                    agent_id: agent,
                    name: String::from("planner_0"),
                    kind: AgentKind::Planner,
                    persona: serde_json::Value::Null,
                }],
            )
            .await
            .unwrap();
        store
            .append_actions(
                run.id,
                &[Action::error(agent, 0, "boom"), Action::error(agent, 1, "boom")],
            )
            .await
            .unwrap();
        store
            .append_metrics(&RunMetrics {
                run_id: run.id,
                tick: 2,
                kpis: KpiSnapshot::default(),
            })
            .await
            .unwrap();
        run.status = RunStatus::Completed;
        store.update_run(&run).await.unwrap();

        assert_eq!(store.agents(run.id).await.len(), 1);
        let actions = store.actions(run.id).await;
        assert_eq!(actions.len(), 2);
        assert!(matches!(
            actions.last().map(|a| &a.action_data),
            Some(ActionData::Error { .. })
        ));
        assert_eq!(store.metrics(run.id).await.len(), 1);
        assert_eq!(store.run(run.id).await.map(|r| r.status), Some(RunStatus::Completed));
    }

    #[tokio::test]
    async fn unknown_runs_and_closed_stores_reject_writes() {
        let store = MemoryStore::new();
        let run = SimulationRun::pending(RunId::new(), &scenario());
        assert!(matches!(
            store.append_actions(run.id, &[]).await,
            Err(DbError::RunNotFound(id)) if id == run.id
        ));

        store.create_run(&run).await.unwrap();
        store.close().await.unwrap();
        assert!(store.is_closed().await);
        assert!(matches!(store.update_run(&run).await, Err(DbError::Closed)));
    }
}
