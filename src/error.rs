use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// A single run either fully succeeds or fully fails; there is no partial
/// month sequence and no retry inside the core.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    /// Bad, missing, or out-of-range input, caught before any simulation
    /// work begins.
    #[error("validation error: {0}")]
    Validation(String),

    /// Colony initializer preconditions violated.
    #[error("invalid colony: {0}")]
    InvalidColony(String),

    /// Unexpected internal failure mid-run; the whole run is discarded.
    #[error("simulation run failed: {0}")]
    Run(String),

    /// The run was cancelled between months by the orchestrator.
    #[error("simulation cancelled after month {0}")]
    Cancelled(u32),

    /// Fewer than half of the requested Monte Carlo runs succeeded.
    #[error("aggregation error: {0}")]
    Aggregation(String),
}

pub type SimResult<T> = Result<T, SimulationError>;
