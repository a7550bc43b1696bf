//! The persistence contract used by the simulation engine.
//!
//! Every write is an append except [`PersistenceStore::update_run`], which
//! replaces the run record and is only called on status transitions.

use citylab_types::{Action, AgentDescriptor, RunId, RunMetrics, SimulationRun, StateSnapshot};
use futures::future::BoxFuture;

use crate::error::DbError;

/// Append-only writers for one or more simulation runs.
pub trait PersistenceStore: Send + Sync {
    /// Record a new run, normally in `pending` status.
    fn create_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>>;

    /// Replace the stored run record (status, times, error, final metrics).
    fn update_run<'a>(&'a self, run: &'a SimulationRun) -> BoxFuture<'a, Result<(), DbError>>;

    /// Register a run's agents under their stable ids.
    fn register_agents<'a>(
        &'a self,
        run_id: RunId,
        agents: &'a [AgentDescriptor],
    ) -> BoxFuture<'a, Result<(), DbError>>;

    /// Append a state snapshot.
    fn append_snapshot<'a>(
        &'a self,
        run_id: RunId,
        snapshot: &'a StateSnapshot,
    ) -> BoxFuture<'a, Result<(), DbError>>;

    /// Append one tick's actions, in registry order.
    fn append_actions<'a>(
        &'a self,
        run_id: RunId,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<(), DbError>>;

    /// Append a metrics row.
    fn append_metrics<'a>(&'a self, metrics: &'a RunMetrics) -> BoxFuture<'a, Result<(), DbError>>;

    /// Flush and release resources.
    fn close(&self) -> BoxFuture<'_, Result<(), DbError>>;
}
