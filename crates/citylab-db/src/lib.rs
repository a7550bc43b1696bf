//! Persistence for CityLab simulation runs.
//!
//! The engine writes through the [`PersistenceStore`] trait: one run record,
//! its agent registry, hourly state snapshots, every action of every tick,
//! and the final metrics row.
//!
//! # Modules
//!
//! - [`store`] -- The [`PersistenceStore`] contract
//! - [`memory`] -- [`MemoryStore`], an in-process implementation
//! - [`postgres`] -- [`PostgresStore`] over a `sqlx` pool, with migrations
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{DEFAULT_MAX_CONNECTIONS, PostgresConfig, PostgresStore};
pub use store::PersistenceStore;
