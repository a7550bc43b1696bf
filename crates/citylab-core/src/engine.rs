//! The simulation engine: drives a [`CityModel`] across a horizon, persists
//! the timeline, and owns the run-status lifecycle.
//!
//! ```text
//! pending --initialize--> running --run--> completed
//!    |                       |------------> failed     (error after init)
//!    |                       +------------> cancelled  (RunControl)
//!    +-- initialization failure: stays pending
//! ```
//!
//! Every tick persists its actions. Every tick that starts a simulated hour
//! persists a state snapshot first. Nothing persisted is rolled back when a
//! later tick fails.

use std::sync::Arc;

use chrono::Utc;
use citylab_agents::aggregate_kpis;
use citylab_db::{DbError, PersistenceStore};
use citylab_types::{CityData, RunId, RunMetrics, RunStatus, ScenarioConfig, SimulationRun};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::SimulationClock;
use crate::config::CityLabConfig;
use crate::control::RunControl;
use crate::model::{CityModel, Collaborators, ModelError, ModelOptions};

/// Errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The model could not be built. The run stays `pending`.
    #[error("initialization failed: {source}")]
    Initialization {
        /// The underlying model error.
        source: ModelError,
    },

    /// A tick failed after initialization. The run is `failed`.
    #[error("execution failed: {source}")]
    Execution {
        /// The underlying model error.
        #[from]
        source: ModelError,
    },

    /// A write to the store failed.
    #[error("persistence failed: {source}")]
    Persistence {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// `run` or `cleanup` was called before a successful `initialize`.
    #[error("engine is not initialized")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("engine is already initialized for run {run_id}")]
    AlreadyInitialized {
        /// The existing run.
        run_id: RunId,
    },

    /// `run` was called on a run that is not `running`.
    #[error("run is {status:?}, not running")]
    NotRunning {
        /// Current status.
        status: RunStatus,
    },

    /// The requested horizon exceeds the configured maximum.
    #[error("simulation_days {requested} exceeds the maximum of {max}")]
    InvalidHorizon {
        /// Days requested.
        requested: u32,
        /// Configured maximum.
        max: u32,
    },
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Final run record.
    pub run: SimulationRun,
    /// Ticks executed.
    pub ticks_executed: u64,
    /// State snapshots written.
    pub snapshots_persisted: u64,
    /// Action records written.
    pub actions_persisted: u64,
}

#[derive(Debug, Default)]
struct LoopStats {
    ticks: u64,
    snapshots: u64,
    actions: u64,
    cancelled: bool,
}

/// Drives one simulation run.
pub struct SimulationEngine {
    store: Arc<dyn PersistenceStore>,
    collaborators: Collaborators,
    options: ModelOptions,
    max_simulation_days: u32,
    control: RunControl,
    run: Option<SimulationRun>,
    model: Option<CityModel>,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("run", &self.run)
            .field("model", &self.model)
            .field("max_simulation_days", &self.max_simulation_days)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Create an engine writing to `store`.
    pub fn new(
        config: &CityLabConfig,
        store: Arc<dyn PersistenceStore>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            store,
            collaborators,
            options: ModelOptions::from_config(config),
            max_simulation_days: config.simulation.max_simulation_days,
            control: RunControl::new(),
            run: None,
            model: None,
        }
    }

    /// Use an existing cancellation handle.
    #[must_use]
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    /// Override model options.
    #[must_use]
    pub const fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// A handle that cancels this engine's run.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// The run record, once `initialize` has been called.
    pub const fn run_record(&self) -> Option<&SimulationRun> {
        self.run.as_ref()
    }

    /// The model, once initialized.
    pub const fn model(&self) -> Option<&CityModel> {
        self.model.as_ref()
    }

    /// Record a pending run, build the model, register its agents, and move
    /// the run to `running`.
    ///
    /// The scenario carries the agent configuration and the seed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Initialization`] if the model cannot be built,
    /// leaving the run `pending`, and [`EngineError::Persistence`] if the
    /// store rejects the run.
    pub async fn initialize(
        &mut self,
        scenario: &ScenarioConfig,
        city_data: &CityData,
    ) -> Result<RunId, EngineError> {
        if let Some(run) = &self.run {
            return Err(EngineError::AlreadyInitialized { run_id: run.id });
        }

        let mut run = SimulationRun::pending(RunId::new(), scenario);
        self.store.create_run(&run).await?;
        let run_id = run.id;
        self.run = Some(run.clone());

        let model = CityModel::new(scenario, city_data, self.options, self.collaborators.clone())
            .map_err(|source| {
                error!(%run_id, %source, "Model construction failed, run stays pending");
                EngineError::Initialization { source }
            })?;

        let descriptors: Vec<_> = model.agents().iter().map(|agent| agent.descriptor()).collect();
        self.store.register_agents(run_id, &descriptors).await?;

        run.status = RunStatus::Running;
        run.start_time = Some(Utc::now());
        self.store.update_run(&run).await?;

        info!(
            %run_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            agents = descriptors.len(),
            "Run initialized"
        );
        self.run = Some(run);
        self.model = Some(model);
        Ok(run_id)
    }

    /// Execute `simulation_days` x 1440 ticks in order.
    ///
    /// On success the run is `completed` (or `cancelled` if cancellation was
    /// requested) and final metrics are persisted. On failure the run is
    /// `failed` with the error message, and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] / [`EngineError::NotRunning`]
    /// when called out of order, [`EngineError::InvalidHorizon`] for too many
    /// days, and the execution or persistence error that stopped the run.
    pub async fn run(&mut self, simulation_days: u32) -> Result<RunReport, EngineError> {
        let (Some(run), Some(model)) = (self.run.as_mut(), self.model.as_mut()) else {
            return Err(EngineError::NotInitialized);
        };
        if run.status != RunStatus::Running {
            return Err(EngineError::NotRunning { status: run.status });
        }
        let run_id = run.id;
        run.simulation_days = simulation_days;

        let outcome = if simulation_days > self.max_simulation_days {
            Err(EngineError::InvalidHorizon {
                requested: simulation_days,
                max: self.max_simulation_days,
            })
        } else {
            let total_ticks = SimulationClock::ticks_for_days(simulation_days).unwrap_or(u64::MAX);
            info!(%run_id, simulation_days, total_ticks, "Run started");
            drive(model, self.store.as_ref(), &self.control, run_id, total_ticks).await
        };

        let stats = match outcome {
            Ok(stats) => stats,
            Err(err) => {
                self.fail(&err).await;
                return Err(err);
            }
        };

        let finished = if stats.cancelled {
            self.finish_cancelled().await
        } else {
            self.finish_completed().await
        };
        match finished {
            Ok(run) => Ok(RunReport {
                run,
                ticks_executed: stats.ticks,
                snapshots_persisted: stats.snapshots,
                actions_persisted: stats.actions,
            }),
            Err(err) => {
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    /// Close the store and release the model.
    ///
    /// Consumes the engine, so it can only be called once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] if the store fails to close.
    pub async fn cleanup(self) -> Result<(), EngineError> {
        let run_id = self.run.as_ref().map(|run| run.id);
        drop(self.model);
        self.store.close().await?;
        info!(run_id = ?run_id, "Engine cleaned up");
        Ok(())
    }

    async fn finish_completed(&mut self) -> Result<SimulationRun, EngineError> {
        let (Some(run), Some(model)) = (self.run.as_mut(), self.model.as_ref()) else {
            return Err(EngineError::NotInitialized);
        };
        let kpis = model.city_state().metrics.clone().unwrap_or_else(|| {
            aggregate_kpis(model.agents(), model.city_state(), model.tick())
        });
        self.store
            .append_metrics(&RunMetrics {
                run_id: run.id,
                tick: model.tick(),
                kpis: kpis.clone(),
            })
            .await?;

        run.metrics = Some(kpis);
        run.status = RunStatus::Completed;
        run.end_time = Some(Utc::now());
        self.store.update_run(run).await?;
        info!(run_id = %run.id, ticks = model.tick(), "Run completed");
        Ok(run.clone())
    }

    async fn finish_cancelled(&mut self) -> Result<SimulationRun, EngineError> {
        let Some(run) = self.run.as_mut() else {
            return Err(EngineError::NotInitialized);
        };
        run.status = RunStatus::Cancelled;
        run.end_time = Some(Utc::now());
        self.store.update_run(run).await?;
        info!(run_id = %run.id, "Run cancelled");
        Ok(run.clone())
    }

    async fn fail(&mut self, err: &EngineError) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.status = RunStatus::Failed;
        run.error_message = Some(err.to_string());
        run.end_time = Some(Utc::now());
        error!(run_id = %run.id, error = %err, "Run failed");
        if let Err(update_err) = self.store.update_run(run).await {
            warn!(run_id = %run.id, error = %update_err, "Could not record failed status");
        }
    }
}

/// The tick loop. Returns early, without error, when cancelled.
async fn drive(
    model: &mut CityModel,
    store: &dyn PersistenceStore,
    control: &RunControl,
    run_id: RunId,
    total_ticks: u64,
) -> Result<LoopStats, EngineError> {
    let mut stats = LoopStats::default();
    while stats.ticks < total_ticks {
        if control.is_cancelled() {
            info!(%run_id, tick = model.tick(), "Cancellation requested");
            stats.cancelled = true;
            return Ok(stats);
        }

        let tick = model.tick();
        if SimulationClock::is_hour_boundary(tick) {
            let snapshot = model.snapshot()?;
            store.append_snapshot(run_id, &snapshot).await?;
            stats.snapshots = stats.snapshots.saturating_add(1);
            info!(
                %run_id,
                tick,
                day = SimulationClock::day(tick),
                hour = SimulationClock::hour(tick),
                "State snapshot persisted"
            );
        }

        let summary = model.step().await?;
        store.append_actions(run_id, &summary.actions).await?;

        let written = u64::try_from(summary.actions.len()).unwrap_or(u64::MAX);
        stats.actions = stats.actions.saturating_add(written);
        stats.ticks = stats.ticks.saturating_add(1);
        debug!(%run_id, tick, actions = written, "Tick persisted");
    }
    Ok(stats)
}
