//! Prompt rendering via `minijinja`.
//!
//! Every agent kind has a system template and a user template. Built-in
//! versions ship with the crate; a templates directory laid out as
//! `{kind}/system.j2` and `{kind}/user.j2` overrides them file by file, so
//! operators can tune wording without recompiling.

use std::path::Path;

use citylab_types::AgentKind;
use minijinja::Environment;

use crate::error::AgentError;

const RESIDENT_SYSTEM: &str = "\
You are a resident of a simulated city. You follow a daily schedule of \
activities and choose how to travel between them. Weigh cost, travel time, \
reliability, convenience, and environmental impact against the current \
infrastructure. State your chosen travel mode in plain words.";

const RESIDENT_USER: &str = "\
Current situation:
- Time: {{ hour }}:00 on day {{ day }}
- Current activity: {{ activity }}
- Current location: {{ location }}
- Next activity: {{ next_activity }} at {{ destination }}
- Current mode: {{ mode }}
- Last commute: {{ commute_minutes }} minutes
- Satisfaction: {{ satisfaction }}

City state:
- Traffic: {{ traffic_level }}
- Transit routes: {{ routes | join(\", \") }}
{%- if assigned_route %}
- Your route: {{ assigned_route }} (every {{ headway }} minutes, {{ delay }} minutes delay)
{%- endif %}
{% if documents %}
Relevant policy documents:
{%- for doc in documents %}
- {{ doc.title }}: {{ doc.content }}
{%- endfor %}
{% endif %}
How will you travel to {{ next_activity }}? Consider your schedule, the \
transportation options, and any policy changes.";

const OPERATOR_SYSTEM: &str = "\
You are a transit operator managing public transportation in a simulated \
city. Maximize ridership and coverage while staying within budget, respond \
to demand, and consider equity and accessibility. Say whether service \
should increase, decrease, or stay the same.";

const OPERATOR_USER: &str = "\
Current transit system:
- Routes operated: {{ routes | join(\", \") }}
- Ridership last tick: {% for r in ridership %}{{ r.route }}={{ r.riders }} {% endfor %}
- Headways (minutes): {% for f in frequencies %}{{ f.route }}={{ f.minutes }} {% endfor %}
- Budget: {{ budget }}
- Service coverage: {{ service_coverage }}
{% if documents %}
Relevant policy and budget documents:
{%- for doc in documents %}
- {{ doc.title }}: {{ doc.content }}
{%- endfor %}
{% endif %}
What adjustments should you make to frequencies? Consider budget, demand, \
and policy constraints.";

const PLANNER_SYSTEM: &str = "\
You are an urban planner proposing and evaluating city policies. Ground \
proposals in regulations, budgets, and evidence, and reference specific \
documents when you make a recommendation.";

const PLANNER_USER: &str = "\
Current city metrics:
- Tick: {{ tick }} (day {{ day }}, {{ hour }}:00)
- Traffic: {{ traffic_level }}
- Service coverage: {{ service_coverage }}
- Equity index: {{ equity_index }}
- Proposals so far: {{ proposals }}
{%- if criteria %}
- Evaluation criteria: {{ criteria | join(\", \") }}
{%- endif %}
{% if documents %}
Relevant regulations and case studies:
{%- for doc in documents %}
{{ loop.index }}. {{ doc.title }} ({{ doc.document_type }})
   {{ doc.content }}
{%- endfor %}
{% endif %}
Based on the current state and regulations, what policy should you \
propose? Give specific recommendations with citations.";

const ORCHESTRATOR_SYSTEM: &str = "\
You are the orchestrator of an urban simulation. You coordinate tick \
progression, aggregate KPIs, enforce safety constraints, and summarize \
outcomes for the scenario under test.";

const ORCHESTRATOR_USER: &str = "\
Simulation state:
- Current tick: {{ tick }}
- Scenario: {{ scenario }}
- Policy: {{ policy_type }}
{%- if kpis %}
- Transit modal share: {{ kpis.transit_modal_share }}
- Average commute: {{ kpis.avg_commute_time }} minutes
- Ridership: {{ kpis.transit_ridership }}
{%- endif %}
{%- if constraints %}
- Safety constraints: {{ constraints }}
{%- endif %}

What should happen in the next simulation tick?";

/// A system and user message pair ready for a reasoning provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Role-setting system message.
    pub system: String,
    /// Situation-specific user message.
    pub user: String,
}

/// Holds the prompt templates for every agent kind.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

fn builtin(kind: AgentKind) -> (&'static str, &'static str) {
    match kind {
        AgentKind::Resident => (RESIDENT_SYSTEM, RESIDENT_USER),
        AgentKind::TransitOperator => (OPERATOR_SYSTEM, OPERATOR_USER),
        AgentKind::Planner => (PLANNER_SYSTEM, PLANNER_USER),
        AgentKind::Orchestrator => (ORCHESTRATOR_SYSTEM, ORCHESTRATOR_USER),
    }
}

impl PromptEngine {
    /// Engine with the built-in templates only.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if a built-in template fails to parse.
    pub fn builtin() -> Result<Self, AgentError> {
        Self::load(None)
    }

    /// Engine with built-in templates, overridden by any files found under
    /// `templates_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if an override cannot be read or a
    /// template fails to parse.
    pub fn load(templates_dir: Option<&Path>) -> Result<Self, AgentError> {
        let mut env = Environment::new();
        for kind in AgentKind::ALL {
            let (system, user) = builtin(kind);
            for (part, source) in [("system", system), ("user", user)] {
                let source = match templates_dir {
                    Some(dir) => {
                        read_override(dir, kind, part)?.unwrap_or_else(|| source.to_owned())
                    }
                    None => source.to_owned(),
                };
                env.add_template_owned(template_name(kind, part), source)
                    .map_err(|e| {
                        AgentError::Template(format!("failed to add {kind}/{part}: {e}"))
                    })?;
            }
        }
        Ok(Self { env })
    }

    /// Render both messages for `kind` from a serialized context.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if rendering fails.
    pub fn render(
        &self,
        kind: AgentKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, AgentError> {
        Ok(RenderedPrompt {
            system: self.render_part(kind, "system", context)?,
            user: self.render_part(kind, "user", context)?,
        })
    }

    fn render_part(
        &self,
        kind: AgentKind,
        part: &str,
        context: &serde_json::Value,
    ) -> Result<String, AgentError> {
        self.env
            .get_template(&template_name(kind, part))
            .map_err(|e| AgentError::Template(format!("missing {kind}/{part}: {e}")))?
            .render(context)
            .map_err(|e| AgentError::Template(format!("{kind}/{part} render failed: {e}")))
    }
}

fn template_name(kind: AgentKind, part: &str) -> String {
    format!("{}/{part}.j2", kind.as_str())
}

fn read_override(dir: &Path, kind: AgentKind, part: &str) -> Result<Option<String>, AgentError> {
    let path = dir.join(kind.as_str()).join(format!("{part}.j2"));
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| AgentError::Template(format!("failed to read {}: {e}", path.display())))
}
