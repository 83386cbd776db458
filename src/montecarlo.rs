//! Monte Carlo sensitivity analysis.
//!
//! Each run perturbs the variable parameters with `Normal(base, base*cv)`
//! draws, owns an independently-seeded generator, and executes on a rayon
//! worker pool (cores - 1, minimum 1). Workers share no mutable state and
//! report a result exactly once; the orchestrator aggregates the runs
//! that succeeded.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::{simulate_seeded, validate_request, SimulationResult};
use crate::error::{SimResult, SimulationError};
use crate::params::ParameterSet;
use crate::rng::{derive_run_seed, run_rng, SimRng};

pub const MAX_SIMULATIONS: u32 = 1000;
pub const MAX_VARIATION_COEFFICIENT: f64 = 0.5;

/// Mean/median/spread and the 95% interval for one tracked metric.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Cross-run band for one month index, for population-over-time plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBand {
    pub month: u32,
    pub population: MetricSummary,
    pub deaths: MetricSummary,
}

/// Aggregated statistics over the successful runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub runs_requested: u32,
    pub runs_succeeded: u32,
    pub final_population: MetricSummary,
    pub final_sterilized: MetricSummary,
    pub total_cost: MetricSummary,
    pub total_deaths: MetricSummary,
    pub kitten_deaths: MetricSummary,
    pub adult_deaths: MetricSummary,
    pub natural_deaths: MetricSummary,
    pub urban_deaths: MetricSummary,
    pub disease_deaths: MetricSummary,
    pub total_births: MetricSummary,
    pub monthly: Vec<MonthlyBand>,
}

/// Inputs shared by every run of one analysis.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloRequest {
    pub current_size: u32,
    pub months: u32,
    pub sterilized_count: u32,
    pub monthly_sterilization: u32,
    pub num_simulations: u32,
    pub variation_coefficient: f64,
}

/// Draw a perturbed parameter variant for one run.
///
/// Rate-like parameters clip into their unit ranges (open-interval rates
/// keep a small positive floor so a perturbed set still validates); risk
/// parameters clip at zero.
pub fn perturb_parameters(base: &ParameterSet, cv: f64, rng: &mut SimRng) -> ParameterSet {
    let mut params = base.clone();
    {
        let open_unit = [
            &mut params.breeding_rate,
            &mut params.kitten_survival_rate,
            &mut params.adult_survival_rate,
            &mut params.female_ratio,
        ];
        for value in open_unit {
            *value = sample_around(*value, cv, rng).clamp(0.01, 1.0);
        }
    }
    {
        let closed_unit = [
            &mut params.seasonal_breeding_amplitude,
            &mut params.base_food_capacity,
            &mut params.food_scaling_factor,
            &mut params.water_availability,
            &mut params.shelter_quality,
            &mut params.caretaker_support,
            &mut params.feeding_consistency,
        ];
        for value in closed_unit {
            *value = sample_around(*value, cv, rng).clamp(0.0, 1.0);
        }
    }
    {
        let non_negative = [
            &mut params.urban_risk,
            &mut params.disease_risk,
            &mut params.natural_risk,
        ];
        for value in non_negative {
            *value = sample_around(*value, cv, rng).max(0.0);
        }
    }
    params
}

fn sample_around(mean: f64, cv: f64, rng: &mut SimRng) -> f64 {
    let std_dev = mean.abs() * cv;
    if std_dev <= 0.0 {
        return mean;
    }
    let dist = rand_distr::Normal::new(mean, std_dev)
        .expect("standard deviation checked to be positive and finite");
    rand_distr::Distribution::sample(&dist, rng)
}

/// Run the analysis with a caller-supplied per-run function.
///
/// The production path passes the simulation engine; tests can inject a
/// runner that always fails to exercise the aggregation threshold.
pub fn run_monte_carlo_with<F>(
    base_params: &ParameterSet,
    request: MonteCarloRequest,
    base_seed: u64,
    run_fn: F,
) -> SimResult<MonteCarloSummary>
where
    F: Fn(&ParameterSet, u64) -> SimResult<SimulationResult> + Sync,
{
    validate_request(
        base_params,
        request.current_size,
        request.months,
        request.sterilized_count,
    )?;
    if !(1..=MAX_SIMULATIONS).contains(&request.num_simulations) {
        return Err(SimulationError::Validation(format!(
            "num_simulations must lie in [1, {MAX_SIMULATIONS}], got {}",
            request.num_simulations
        )));
    }
    let cv = request.variation_coefficient;
    if !(cv > 0.0 && cv <= MAX_VARIATION_COEFFICIENT) {
        return Err(SimulationError::Validation(format!(
            "variation_coefficient must lie in (0, {MAX_VARIATION_COEFFICIENT}], got {cv}"
        )));
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| SimulationError::Run(format!("failed to build worker pool: {e}")))?;

    let outcomes: Vec<SimResult<SimulationResult>> = pool.install(|| {
        (0..u64::from(request.num_simulations))
            .into_par_iter()
            .map(|run_index| {
                let seed = derive_run_seed(base_seed, run_index);
                let mut perturb_rng = run_rng(seed ^ 0x9e37_79b9_7f4a_7c15);
                let params = perturb_parameters(base_params, cv, &mut perturb_rng);
                run_fn(&params, seed)
            })
            .collect()
    });

    let successes: Vec<SimulationResult> = outcomes.into_iter().filter_map(Result::ok).collect();
    let requested = request.num_simulations;
    if (successes.len() as u32) * 2 < requested {
        return Err(SimulationError::Aggregation(format!(
            "only {} of {requested} runs succeeded",
            successes.len()
        )));
    }

    Ok(aggregate(&successes, requested, request.months))
}

/// Run the analysis with an explicit base seed (reproducible).
pub fn run_monte_carlo_seeded(
    base_params: &ParameterSet,
    request: MonteCarloRequest,
    base_seed: u64,
) -> SimResult<MonteCarloSummary> {
    run_monte_carlo_with(base_params, request, base_seed, |params, seed| {
        simulate_seeded(
            params,
            request.current_size,
            request.months,
            request.sterilized_count,
            request.monthly_sterilization,
            seed,
        )
    })
}

/// Run the analysis with a fresh random base seed.
pub fn run_monte_carlo(
    base_params: &ParameterSet,
    request: MonteCarloRequest,
) -> SimResult<MonteCarloSummary> {
    run_monte_carlo_seeded(base_params, request, rand::thread_rng().gen())
}

fn aggregate(runs: &[SimulationResult], requested: u32, months: u32) -> MonteCarloSummary {
    let metric = |f: &dyn Fn(&SimulationResult) -> f64| {
        summarize(runs.iter().map(f).collect())
    };

    let monthly = (0..=months)
        .map(|month| {
            let index = month as usize;
            MonthlyBand {
                month,
                population: summarize(
                    runs.iter().map(|r| f64::from(r.months[index].total)).collect(),
                ),
                deaths: summarize(
                    runs.iter()
                        .map(|r| f64::from(r.months[index].deaths.total()))
                        .collect(),
                ),
            }
        })
        .collect();

    MonteCarloSummary {
        runs_requested: requested,
        runs_succeeded: runs.len() as u32,
        final_population: metric(&|r| f64::from(r.final_population)),
        final_sterilized: metric(&|r| f64::from(r.final_sterilized)),
        total_cost: metric(&|r| r.total_cost),
        total_deaths: metric(&|r| f64::from(r.total_deaths)),
        kitten_deaths: metric(&|r| f64::from(r.kitten_deaths)),
        adult_deaths: metric(&|r| f64::from(r.adult_deaths)),
        natural_deaths: metric(&|r| f64::from(r.deaths_by_cause.natural)),
        urban_deaths: metric(&|r| f64::from(r.deaths_by_cause.urban)),
        disease_deaths: metric(&|r| f64::from(r.deaths_by_cause.disease)),
        total_births: metric(&|r| f64::from(r.total_births)),
        monthly,
    }
}

/// Mean, median, population standard deviation, and the 2.5/97.5
/// percentiles of a sample.
fn summarize(mut values: Vec<f64>) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary::default();
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    MetricSummary {
        mean,
        median: percentile(&values, 50.0),
        std_dev: variance.sqrt(),
        ci_low: percentile(&values, 2.5),
        ci_high: percentile(&values, 97.5),
    }
}

/// Linear-interpolated percentile of a sorted sample.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    let weight = rank - low as f64;
    sorted[low] * (1.0 - weight) + sorted[high] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MonteCarloRequest {
        MonteCarloRequest {
            current_size: 40,
            months: 12,
            sterilized_count: 5,
            monthly_sterilization: 2,
            num_simulations: 8,
            variation_coefficient: 0.2,
        }
    }

    #[test]
    fn summarize_matches_hand_computed_values() {
        let summary = summarize(vec![4.0, 1.0, 3.0, 2.0]);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.std_dev - (1.25_f64).sqrt()).abs() < 1e-12);
        assert!(summary.ci_low >= 1.0 && summary.ci_low < 1.5);
        assert!(summary.ci_high > 3.5 && summary.ci_high <= 4.0);
    }

    #[test]
    fn perturbation_respects_the_clip_ranges() {
        let base = ParameterSet::default();
        let mut rng = run_rng(77);
        for _ in 0..200 {
            let p = perturb_parameters(&base, 0.5, &mut rng);
            p.validate().unwrap();
            assert!(p.breeding_rate >= 0.01 && p.breeding_rate <= 1.0);
            assert!(p.urban_risk >= 0.0);
            // Non-variable parameters are untouched.
            assert_eq!(p.territory_size, base.territory_size);
            assert_eq!(p.kitten_maturity_months, base.kitten_maturity_months);
        }
    }

    #[test]
    fn forced_all_run_failure_surfaces_an_aggregation_error() {
        let base = ParameterSet::default();
        let mut req = request();
        req.num_simulations = 5;
        req.variation_coefficient = 0.5;
        let err = run_monte_carlo_with(&base, req, 1, |_, _| {
            Err(SimulationError::Run("stubbed worker failure".into()))
        })
        .unwrap_err();
        assert!(matches!(err, SimulationError::Aggregation(_)));
    }

    #[test]
    fn successful_analysis_aggregates_every_month() {
        let base = ParameterSet::default();
        let summary = run_monte_carlo_seeded(&base, request(), 42).unwrap();
        assert_eq!(summary.runs_succeeded, 8);
        assert_eq!(summary.monthly.len(), 13);
        assert!(summary.final_population.ci_low <= summary.final_population.median);
        assert!(summary.final_population.median <= summary.final_population.ci_high);
    }

    #[test]
    fn bad_analysis_inputs_fail_validation() {
        let base = ParameterSet::default();
        let mut req = request();
        req.num_simulations = 0;
        assert!(matches!(
            run_monte_carlo_seeded(&base, req, 1),
            Err(SimulationError::Validation(_))
        ));
        let mut req = request();
        req.variation_coefficient = 0.9;
        assert!(matches!(
            run_monte_carlo_seeded(&base, req, 1),
            Err(SimulationError::Validation(_))
        ));
    }
}
