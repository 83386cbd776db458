use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use felisim::{
    engine::simulate_seeded,
    montecarlo::run_monte_carlo_seeded,
    scenario::ScenarioLoader,
    snapshot::ResultWriter,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Feral cat colony population simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/harbor_colony.yaml")]
    scenario: PathBuf,

    /// Override the month count (uses the scenario default when omitted)
    #[arg(long)]
    months: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run the Monte Carlo analysis instead of a single simulation
    #[arg(long)]
    monte_carlo: bool,

    /// Override the Monte Carlo run count
    #[arg(long)]
    runs: Option<u32>,

    /// Directory for result files
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let params = scenario.build_params()?;
    let months = scenario.months(cli.months);
    let seed = cli.seed.unwrap_or(scenario.random_seed);
    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&scenario.output.dir));
    let writer = ResultWriter::new(&output_dir)?;

    if cli.monte_carlo {
        let request = scenario.monte_carlo_request(months, cli.runs);
        let summary = run_monte_carlo_seeded(&params, request, seed)?;
        let path = writer.write_monte_carlo(&scenario.name, &summary)?;
        println!(
            "Scenario '{}': {}/{} runs over {} months. Final population {:.1} (95% CI {:.1}-{:.1}), total cost {:.0}. Results: {}",
            scenario.name,
            summary.runs_succeeded,
            summary.runs_requested,
            months,
            summary.final_population.mean,
            summary.final_population.ci_low,
            summary.final_population.ci_high,
            summary.total_cost.mean,
            path.display()
        );
    } else {
        let result = simulate_seeded(
            &params,
            scenario.colony.size,
            months,
            scenario.colony.sterilized,
            scenario.colony.monthly_sterilization,
            seed,
        )?;
        let path = writer.write_simulation(&scenario.name, &result)?;
        println!(
            "Scenario '{}' completed over {} months. Population {} -> {}, {} births, {} deaths, {} sterilizations. Results: {}",
            scenario.name,
            months,
            scenario.colony.size,
            result.final_population,
            result.total_births,
            result.total_deaths,
            result.sterilizations_performed,
            path.display()
        );
    }
    Ok(())
}
