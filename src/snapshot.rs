//! Persisting run output as JSON checkpoints.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::SimulationResult;
use crate::montecarlo::MonteCarloSummary;

/// Metadata written next to every result file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario: String,
    pub months: u32,
    pub timestamp: String,
}

/// Writes results into `<output_dir>/<scenario>/`.
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> std::io::Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn write_simulation(
        &self,
        scenario: &str,
        result: &SimulationResult,
    ) -> std::io::Result<PathBuf> {
        let dir = self.prepare(scenario)?;
        let path = dir.join("simulation.json");
        fs::write(&path, serde_json::to_string_pretty(result)?)?;
        self.write_metadata(&dir, scenario, result.months.len().saturating_sub(1) as u32)?;
        Ok(path)
    }

    pub fn write_monte_carlo(
        &self,
        scenario: &str,
        summary: &MonteCarloSummary,
    ) -> std::io::Result<PathBuf> {
        let dir = self.prepare(scenario)?;
        let path = dir.join("monte_carlo.json");
        fs::write(&path, serde_json::to_string_pretty(summary)?)?;
        self.write_metadata(
            &dir,
            scenario,
            summary.monthly.len().saturating_sub(1) as u32,
        )?;
        Ok(path)
    }

    fn prepare(&self, scenario: &str) -> std::io::Result<PathBuf> {
        let dir = self.output_dir.join(scenario);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_metadata(&self, dir: &Path, scenario: &str, months: u32) -> std::io::Result<()> {
        let metadata = RunMetadata {
            scenario: scenario.to_string(),
            months,
            timestamp: chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
        };
        fs::write(
            dir.join("metadata.json"),
            serde_json::to_string_pretty(&metadata)?,
        )
    }
}
