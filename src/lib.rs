pub mod breeding;
pub mod colony;
pub mod engine;
pub mod environment;
pub mod error;
pub mod montecarlo;
pub mod mortality;
pub mod params;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod sterilization;

pub use engine::{simulate, simulate_seeded, MonthlySnapshot, SimulationEngine, SimulationResult};
pub use error::SimulationError;
pub use montecarlo::{
    run_monte_carlo, run_monte_carlo_seeded, MonteCarloRequest, MonteCarloSummary,
};
pub use params::ParameterSet;
pub use scenario::{Scenario, ScenarioLoader};
