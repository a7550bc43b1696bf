//! Agents of the CityLab simulation and the contracts they reason through.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] record, its perceive/reason/act step, and the
//!   [`AgentRuntime`] shared across a run.
//! - [`resident`], [`transit`], [`planner`], [`orchestrator`] -- The four
//!   agent variants and their fallback rules.
//! - [`registry`] -- Building agents from scenario configuration.
//! - [`reasoning`] -- The [`ReasoningProvider`] contract and deadline handling.
//! - [`retrieval`] -- The [`DocumentRetriever`] contract and a keyword ranker.
//! - [`prompt`] -- Per-kind prompt templates.
//! - [`classify`] -- Keyword rules that turn provider text into decisions.
//! - [`kpi`] -- KPI aggregation over agent states.
//! - [`persona`], [`perception`], [`memory`] -- Agent inputs and recall.
//! - [`error`] -- Error types.

pub mod agent;
pub mod classify;
pub mod error;
pub mod kpi;
pub mod memory;
pub mod orchestrator;
pub mod perception;
pub mod persona;
pub mod planner;
pub mod prompt;
pub mod reasoning;
pub mod registry;
pub mod resident;
pub mod retrieval;
pub mod transit;

pub use agent::{Agent, AgentRole, AgentRuntime, Decision, DecisionOrigin, FALLBACK_CONFIDENCE};
pub use error::{AgentError, ReasoningError, RetrievalError};
pub use kpi::aggregate_kpis;
pub use memory::{DEFAULT_MEMORY_CAPACITY, MAX_MEMORY_CAPACITY, Memory, MemoryEntry};
pub use perception::{AgentPresence, Environment, Perception};
pub use prompt::{PromptEngine, RenderedPrompt};
pub use reasoning::{ReasoningProvider, StaticReasoning, UnavailableReasoning};
pub use registry::{AgentSetup, build_agents};
pub use retrieval::{DocumentRetriever, KeywordRetriever, NoRetrieval};
