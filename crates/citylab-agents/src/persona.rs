//! Persona configuration per agent kind.
//!
//! Personas arrive as untyped JSON in the scenario file and are parsed into
//! these structs once, at agent creation. They never change afterwards.

use std::collections::BTreeMap;

use citylab_types::{Activity, AgentKind, TravelMode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// One schedule slot: `activity` during `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// First hour of the slot, 0-23.
    pub start_hour: u32,
    /// Hour the slot ends, exclusive, 1-24.
    pub end_hour: u32,
    /// What the resident does during the slot.
    pub activity: Activity,
}

/// Daily schedule. Hours not covered by any slot are spent at home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(pub Vec<ScheduleEntry>);

impl Default for Schedule {
    /// Work from 06:00 to 17:00, home otherwise.
    fn default() -> Self {
        Self(vec![ScheduleEntry {
            start_hour: 6,
            end_hour: 17,
            activity: Activity::Work,
        }])
    }
}

impl Schedule {
    /// The activity planned for `hour`. The first matching slot wins.
    pub fn activity_at(&self, hour: u32) -> Activity {
        self.0
            .iter()
            .find(|slot| slot.start_hour <= hour && hour < slot.end_hour)
            .map_or(Activity::Home, |slot| slot.activity)
    }

    fn validate(&self) -> Result<(), String> {
        for slot in &self.0 {
            if slot.start_hour >= slot.end_hour || slot.end_hour > 24 {
                return Err(format!(
                    "schedule slot {}-{} is not a valid hour range",
                    slot.start_hour, slot.end_hour
                ));
            }
        }
        Ok(())
    }
}

/// Persona of a resident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentPersona {
    /// Home node.
    pub home_location: String,
    /// Work node. Defaults to home.
    #[serde(default)]
    pub work_location: Option<String>,
    /// Daily schedule.
    #[serde(default)]
    pub schedule: Schedule,
    /// Mode used until reasoning says otherwise.
    #[serde(default = "default_mode")]
    pub preferred_mode: TravelMode,
    /// Transit route ridden. Assigned from the seed when absent.
    #[serde(default)]
    pub transit_route: Option<String>,
}

const fn default_mode() -> TravelMode {
    TravelMode::Transit
}

impl ResidentPersona {
    /// Work node, falling back to home.
    pub fn work(&self) -> &str {
        self.work_location.as_deref().unwrap_or(&self.home_location)
    }

    /// Node where `activity` takes place.
    pub fn location_for(&self, activity: Activity) -> &str {
        match activity {
            Activity::Home => &self.home_location,
            Activity::Work => self.work(),
        }
    }
}

/// Persona of a transit operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitOperatorPersona {
    /// Routes operated. Empty means every route in the city.
    #[serde(default)]
    pub routes: Vec<String>,
    /// Budget available for service increases.
    #[serde(default = "default_budget")]
    pub budget: Decimal,
    /// Cost of one headway step per route. Missing routes cost nothing.
    #[serde(default)]
    pub operating_costs: BTreeMap<String, Decimal>,
}

fn default_budget() -> Decimal {
    Decimal::from(1_000_000_u32)
}

/// Persona of a planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerPersona {
    /// Budget limits the planner must respect.
    #[serde(default = "empty_object")]
    pub budget_constraints: serde_json::Value,
    /// Regulations the planner is aware of.
    #[serde(default)]
    pub regulatory_knowledge: Vec<String>,
    /// Criteria proposals are judged by.
    #[serde(default = "default_evaluation_criteria")]
    pub evaluation_criteria: Vec<String>,
}

impl Default for PlannerPersona {
    fn default() -> Self {
        Self {
            budget_constraints: empty_object(),
            regulatory_knowledge: Vec::new(),
            evaluation_criteria: default_evaluation_criteria(),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_evaluation_criteria() -> Vec<String> {
    ["equity", "efficiency", "sustainability", "cost"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Persona of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorPersona {
    /// Scenario name and policy, as shown in prompts.
    #[serde(default)]
    pub scenario_config: serde_json::Value,
    /// Constraints passed to the reasoning provider verbatim.
    #[serde(default)]
    pub safety_constraints: serde_json::Value,
}

/// Parse a persona, treating JSON `null` as an empty object.
///
/// # Errors
///
/// Returns [`AgentError::InvalidPersona`] when the value does not fit `T`.
pub fn parse<T: DeserializeOwned>(
    kind: AgentKind,
    raw: &serde_json::Value,
) -> Result<T, AgentError> {
    let value = if raw.is_null() {
        empty_object()
    } else {
        raw.clone()
    };
    serde_json::from_value(value).map_err(|e| AgentError::InvalidPersona {
        kind,
        reason: e.to_string(),
    })
}

/// Parse and validate a resident persona.
///
/// # Errors
///
/// Returns [`AgentError::InvalidPersona`] for malformed input or schedules.
pub fn parse_resident(raw: &serde_json::Value) -> Result<ResidentPersona, AgentError> {
    let persona: ResidentPersona = parse(AgentKind::Resident, raw)?;
    persona
        .schedule
        .validate()
        .map_err(|reason| AgentError::InvalidPersona {
            kind: AgentKind::Resident,
            reason,
        })?;
    Ok(persona)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_works_daytime() {
        let schedule = Schedule::default();
        assert_eq!(schedule.activity_at(5), Activity::Home);
        assert_eq!(schedule.activity_at(6), Activity::Work);
        assert_eq!(schedule.activity_at(16), Activity::Work);
        assert_eq!(schedule.activity_at(17), Activity::Home);
        assert_eq!(schedule.activity_at(23), Activity::Home);
    }

    #[test]
    fn resident_defaults() {
        let persona = parse_resident(&serde_json::json!({"home_location": "a"})).unwrap();
        assert_eq!(persona.work(), "a");
        assert_eq!(persona.preferred_mode, TravelMode::Transit);
        assert!(persona.transit_route.is_none());
        assert_eq!(persona.location_for(Activity::Work), "a");
    }

    #[test]
    fn resident_requires_home() {
        let err = parse_resident(&serde_json::json!({"work_location": "b"})).unwrap_err();
        assert!(matches!(err, AgentError::InvalidPersona { kind: AgentKind::Resident, .. }));
    }

    #[test]
    fn rejects_inverted_schedule_slots() {
        let err = parse_resident(&serde_json::json!({
            "home_location": "a",
            "schedule": [{"start_hour": 18, "end_hour": 9, "activity": "work"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("18-9"));
    }

    #[test]
    fn null_persona_uses_defaults() {
        let persona: TransitOperatorPersona =
            parse(AgentKind::TransitOperator, &serde_json::Value::Null).unwrap();
        assert!(persona.routes.is_empty());
        assert_eq!(persona.budget, Decimal::from(1_000_000_u32));
    }

    #[test]
    fn planner_defaults_to_the_standard_criteria() {
        let persona: PlannerPersona = parse(AgentKind::Planner, &serde_json::Value::Null).unwrap();
        assert_eq!(
            persona.evaluation_criteria,
            ["equity", "efficiency", "sustainability", "cost"]
        );
        assert!(persona.budget_constraints.is_object());
        assert_eq!(persona, PlannerPersona::default());

        let custom: PlannerPersona = parse(
            AgentKind::Planner,
            &serde_json::json!({"evaluation_criteria": ["emissions"]}),
        )
        .unwrap();
        assert_eq!(custom.evaluation_criteria, ["emissions"]);
    }

    #[test]
    fn budgets_accept_numbers_and_strings() {
        let persona: TransitOperatorPersona = parse(
            AgentKind::TransitOperator,
            &serde_json::json!({"budget": "2500.50", "operating_costs": {"A": 100}}),
        )
        .unwrap();
        assert_eq!(persona.budget, Decimal::new(250_050, 2));
        assert_eq!(persona.operating_costs.get("A"), Some(&Decimal::from(100_u32)));
    }
}
