//! Loading the scenario and city files named on the command line.

use std::path::Path;

use anyhow::Context as _;
use citylab_types::{CityData, ScenarioConfig};
use serde::de::DeserializeOwned;

/// Read and parse a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// The scenario to run and the city to run it in.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Scenario: policy, agents, seed, horizon.
    pub scenario: ScenarioConfig,
    /// City graph, routes, and indicators.
    pub city: CityData,
}

impl Inputs {
    /// Load both files.
    pub fn load(scenario: &Path, city: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            scenario: load_json(scenario)?,
            city: load_json(city)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn scratch(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("citylab-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_a_scenario_with_defaults() {
        let path = scratch(
            r#"{"name": "baseline", "agents": [{"agent_type": "planner"}], "seed": 9}"#,
        );
        let scenario: ScenarioConfig = load_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(scenario.name, "baseline");
        assert_eq!(scenario.seed, 9);
        assert_eq!(scenario.agents.len(), 1);
    }

    #[test]
    fn demo_inputs_load() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let inputs = Inputs::load(&demos.join("scenario.json"), &demos.join("city.json")).unwrap();
        assert_eq!(inputs.scenario.agents.len(), 6);
        assert_eq!(inputs.scenario.seed, 42);
        assert_eq!(inputs.city.transit_routes.len(), 2);
    }

    #[test]
    fn errors_name_the_file() {
        let missing = std::env::temp_dir().join("citylab-does-not-exist.json");
        let err = load_json::<CityData>(&missing).unwrap_err();
        assert!(err.to_string().contains("citylab-does-not-exist.json"));

        let garbage = scratch("{ not json");
        let err = load_json::<CityData>(&garbage).unwrap_err();
        std::fs::remove_file(&garbage).unwrap();
        assert!(err.to_string().starts_with("failed to parse"));
    }
}
