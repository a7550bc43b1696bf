//! City model, simulation clock, and run engine for the CityLab simulation.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `citylab-config.yaml` into
//!   strongly-typed structs.
//! - [`clock`] -- Tick to simulated-time mapping (1 tick = 1 minute).
//! - [`model`] -- [`CityModel`], the single per-tick transition.
//! - [`control`] -- [`RunControl`] for cancelling a run between ticks.
//! - [`engine`] -- [`SimulationEngine`], the run lifecycle and persistence
//!   cadence.
//!
//! [`CityModel`]: model::CityModel
//! [`RunControl`]: control::RunControl
//! [`SimulationEngine`]: engine::SimulationEngine

pub mod clock;
pub mod config;
pub mod control;
pub mod engine;
pub mod model;

pub use clock::{SimulationClock, TICKS_PER_DAY, TICKS_PER_HOUR};
pub use config::{CityLabConfig, ConfigError, LogFormat};
pub use control::RunControl;
pub use engine::{EngineError, RunReport, SimulationEngine};
pub use model::{CityModel, Collaborators, ModelError, ModelOptions, TickSummary};
