//! The orchestrator: acknowledges each tick and keeps the latest KPIs.
//!
//! It never acts on the graph. Its action announces the next tick, with
//! provider text as guidance when available. KPI aggregation itself runs in
//! the model after the update phase; the result is handed back through
//! [`Orchestrator::record_kpis`].

use citylab_types::{ActionData, AgentKind, KpiSnapshot, PolicyType};
use serde::Serialize;

use crate::agent::{AgentRuntime, Decision, DecisionOrigin, FALLBACK_CONFIDENCE, consult_provider};
use crate::error::AgentError;
use crate::perception::Perception;
use crate::persona::OrchestratorPersona;

/// Confidence attached to guidance taken from provider text.
const REASONED_CONFIDENCE: f64 = 0.9;

/// Mutable orchestrator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorState {
    /// Tick the model will execute next.
    pub current_tick: u64,
    /// Scenario under test.
    pub scenario: String,
    /// Policy under test.
    pub policy_type: String,
    /// Constraints from the persona.
    pub safety_constraints: serde_json::Value,
    /// Latest KPI aggregation.
    pub kpis: Option<KpiSnapshot>,
}

/// The tick orchestrator.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    state: OrchestratorState,
}

impl Orchestrator {
    /// Create an orchestrator. Scenario name and policy come from the
    /// persona's `scenario_config`, defaulting to the running scenario.
    pub fn new(persona: OrchestratorPersona, scenario_name: &str, policy_type: PolicyType) -> Self {
        let scenario = persona
            .scenario_config
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(scenario_name)
            .to_owned();
        let policy_type = persona
            .scenario_config
            .get("policy_type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(policy_type.as_str())
            .to_owned();
        Self {
            state: OrchestratorState {
                current_tick: 0,
                scenario,
                policy_type,
                safety_constraints: persona.safety_constraints,
                kpis: None,
            },
        }
    }

    /// Current state.
    pub const fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub(crate) async fn reason(
        &self,
        perception: &Perception,
        runtime: &AgentRuntime,
    ) -> Result<Decision, AgentError> {
        let next_tick = perception
            .tick
            .checked_add(1)
            .ok_or_else(|| AgentError::ArithmeticOverflow {
                context: String::from("next tick"),
            })?;

        let consultation = consult_provider(runtime, AgentKind::Orchestrator, perception, || {
            serde_json::json!({
                "tick": perception.tick,
                "scenario": self.state.scenario,
                "policy_type": self.state.policy_type,
                "kpis": self.state.kpis,
                "constraints": (!self.state.safety_constraints.is_null())
                    .then(|| self.state.safety_constraints.to_string()),
            })
        })
        .await?;

        Ok(match consultation.reply {
            Some(text) => Decision {
                action: ActionData::Tick {
                    next_tick,
                    instructions: text.clone(),
                },
                rationale: text,
                confidence: REASONED_CONFIDENCE,
                origin: DecisionOrigin::Reasoning,
                prompt: consultation.prompt,
            },
            None => Decision {
                action: ActionData::Tick {
                    next_tick,
                    instructions: String::from("Proceed with scheduled activities"),
                },
                rationale: String::from("Advancing to the next tick"),
                confidence: FALLBACK_CONFIDENCE,
                origin: DecisionOrigin::Fallback,
                prompt: consultation.prompt,
            },
        })
    }

    pub(crate) fn apply(&mut self, action: &ActionData) {
        if let ActionData::Tick { next_tick, .. } = action {
            self.state.current_tick = *next_tick;
        }
    }

    /// Store the latest KPI aggregation.
    pub fn record_kpis(&mut self, kpis: KpiSnapshot) {
        self.state.kpis = Some(kpis);
    }
}
