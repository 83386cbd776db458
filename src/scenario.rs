//! Scenario files: named colony setups loaded from YAML.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::montecarlo::MonteCarloRequest;
use crate::params::ParameterSet;

fn default_seed() -> u64 {
    7
}

fn default_months() -> u32 {
    24
}

fn default_runs() -> u32 {
    100
}

fn default_variation() -> f64 {
    0.1
}

fn default_output_dir() -> String {
    "results".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    #[serde(default = "default_months")]
    pub months: u32,
    pub colony: ColonySetup,
    /// Parameter overrides by name; anything absent keeps its default.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub monte_carlo: Option<MonteCarloSettings>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonySetup {
    pub size: u32,
    #[serde(default)]
    pub sterilized: u32,
    #[serde(default)]
    pub monthly_sterilization: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloSettings {
    #[serde(default = "default_runs")]
    pub runs: u32,
    #[serde(default = "default_variation")]
    pub variation_coefficient: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Resolve the overrides into a validated parameter set.
    pub fn build_params(&self) -> SimResult<ParameterSet> {
        let overrides: HashMap<String, f64> = self
            .parameters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        ParameterSet::from_overrides(&overrides)
    }

    /// Monte Carlo request for this scenario, honoring overrides.
    pub fn monte_carlo_request(
        &self,
        months: u32,
        runs_override: Option<u32>,
    ) -> MonteCarloRequest {
        let settings = self.monte_carlo.clone().unwrap_or(MonteCarloSettings {
            runs: default_runs(),
            variation_coefficient: default_variation(),
        });
        MonteCarloRequest {
            current_size: self.colony.size,
            months,
            sterilized_count: self.colony.sterilized,
            monthly_sterilization: self.colony.monthly_sterilization,
            num_simulations: runs_override.unwrap_or(settings.runs),
            variation_coefficient: settings.variation_coefficient,
        }
    }

    pub fn months(&self, override_months: Option<u32>) -> u32 {
        override_months.unwrap_or(self.months)
    }

    /// Save to YAML, mirroring the loader.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Built-in starter scenario: a mid-sized urban colony under a
    /// modest trap-neuter-return program.
    pub fn harbor_colony() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("territory_size".to_string(), 2000.0);
        parameters.insert("seasonal_breeding_amplitude".to_string(), 0.1);
        parameters.insert("caretaker_support".to_string(), 0.7);
        Self {
            name: "harbor_colony".to_string(),
            description: Some("Mid-sized harbor colony with weekly feeders and a TNR van".into()),
            random_seed: default_seed(),
            months: default_months(),
            colony: ColonySetup {
                size: 60,
                sterilized: 15,
                monthly_sterilization: 4,
            },
            parameters,
            monte_carlo: Some(MonteCarloSettings {
                runs: default_runs(),
                variation_coefficient: default_variation(),
            }),
            output: OutputConfig::default(),
        }
    }
}
