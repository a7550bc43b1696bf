//! City geography and shared city state for the CityLab simulation.
//!
//! # Modules
//!
//! - [`graph`] -- The immutable [`CityGraph`] with neighbor lookups and
//!   shortest-path travel times.
//! - [`state`] -- Seeding of the shared [`CityState`] and the per-tick update
//!   rules that are its only writer.
//! - [`error`] -- Error types for graph construction and state updates.
//!
//! [`CityState`]: citylab_types::CityState

pub mod error;
pub mod graph;
pub mod state;

pub use error::WorldError;
pub use graph::{CityGraph, Edge, Node, Path};
pub use state::{
    DEFAULT_EQUITY_INDEX, DEFAULT_FREQUENCY_MINUTES, DEFAULT_ROUTE_ID, TickUpdate,
    apply_tick_actions, seed_city_state,
};
