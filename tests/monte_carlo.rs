use std::sync::atomic::{AtomicU32, Ordering};

use felisim::engine::simulate_seeded;
use felisim::montecarlo::{
    run_monte_carlo_seeded, run_monte_carlo_with, MonteCarloRequest,
};
use felisim::params::ParameterSet;
use felisim::SimulationError;

fn request(runs: u32) -> MonteCarloRequest {
    MonteCarloRequest {
        current_size: 50,
        months: 18,
        sterilized_count: 10,
        monthly_sterilization: 2,
        num_simulations: runs,
        variation_coefficient: 0.2,
    }
}

#[test]
fn all_worker_failure_returns_an_aggregation_error() {
    let base = ParameterSet::default();
    let mut req = request(5);
    req.variation_coefficient = 0.5;
    let err = run_monte_carlo_with(&base, req, 9, |_, _| {
        Err(SimulationError::Run("stubbed worker failure".into()))
    })
    .unwrap_err();
    assert!(
        matches!(err, SimulationError::Aggregation(_)),
        "expected an aggregation error, got {err}"
    );
}

#[test]
fn a_minority_of_failed_runs_is_tolerated() {
    let base = ParameterSet::default();
    let req = request(20);
    let calls = AtomicU32::new(0);
    let summary = run_monte_carlo_with(&base, req, 3, |params, seed| {
        if calls.fetch_add(1, Ordering::Relaxed) % 4 == 0 {
            return Err(SimulationError::Run("flaky worker".into()));
        }
        simulate_seeded(params, 50, 18, 10, 2, seed)
    })
    .unwrap();
    assert_eq!(summary.runs_requested, 20);
    assert!(summary.runs_succeeded >= 10);
    assert!(summary.runs_succeeded < 20);
}

#[test]
fn parameter_variation_spreads_the_outcomes() {
    let base = ParameterSet::default();
    let mut req = request(50);
    req.variation_coefficient = 0.3;
    let summary = run_monte_carlo_seeded(&base, req, 17).unwrap();
    assert_eq!(summary.runs_succeeded, 50);
    assert!(
        summary.final_population.std_dev > 0.0,
        "perturbed runs should not collapse to one outcome"
    );
    assert!(summary.total_cost.mean > 0.0);
}

#[test]
fn confidence_intervals_stay_ordered_and_stable_as_runs_grow() {
    let base = ParameterSet::default();
    let narrow = run_monte_carlo_seeded(&base, request(30), 29).unwrap();
    let wide = run_monte_carlo_seeded(&base, request(200), 29).unwrap();

    for summary in [&narrow, &wide] {
        assert!(summary.final_population.ci_low <= summary.final_population.median);
        assert!(summary.final_population.median <= summary.final_population.ci_high);
        assert_eq!(summary.monthly.len(), 19);
    }

    let width = |s: &felisim::MonteCarloSummary| {
        s.final_population.ci_high - s.final_population.ci_low
    };
    // The percentile interval converges with run count instead of
    // drifting wider without bound.
    assert!(
        width(&wide) <= width(&narrow) * 2.0 + 1.0,
        "CI widened from {} to {}",
        width(&narrow),
        width(&wide)
    );
}

#[test]
fn monthly_bands_track_the_initial_population() {
    let base = ParameterSet::default();
    let summary = run_monte_carlo_seeded(&base, request(25), 41).unwrap();
    let first = &summary.monthly[0];
    assert_eq!(first.month, 0);
    // Every run starts from the same colony size.
    assert!((first.population.mean - 50.0).abs() < 1e-9);
    assert_eq!(first.population.std_dev, 0.0);
}

#[test]
fn analysis_inputs_are_validated_before_any_run() {
    let base = ParameterSet::default();
    let mut req = request(0);
    req.num_simulations = 0;
    assert!(matches!(
        run_monte_carlo_seeded(&base, req, 1),
        Err(SimulationError::Validation(_))
    ));

    let mut req = request(10);
    req.num_simulations = 1001;
    assert!(matches!(
        run_monte_carlo_seeded(&base, req, 1),
        Err(SimulationError::Validation(_))
    ));

    let mut req = request(10);
    req.variation_coefficient = 0.0;
    assert!(matches!(
        run_monte_carlo_seeded(&base, req, 1),
        Err(SimulationError::Validation(_))
    ));

    let mut req = request(10);
    req.sterilized_count = 60;
    assert!(matches!(
        run_monte_carlo_seeded(&base, req, 1),
        Err(SimulationError::Validation(_))
    ));
}
