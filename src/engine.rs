//! Simulation engine: the fixed monthly step order and run lifecycle.
//!
//! Per month, in order: environment factors, mortality, abandonment,
//! sterilization, maturation, breeding (pregnancies then births), adult
//! aging, snapshot. A run either completes with a full snapshot sequence
//! or fails with no partial result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::breeding::step_breeding;
use crate::colony::{push_merged, Cohort, ColonyState};
use crate::environment::{carrying_capacity, combined_factor, resource_availability};
use crate::error::{SimResult, SimulationError};
use crate::mortality::{apply_mortality, DeathCauses, DeathReport};
use crate::params::ParameterSet;
use crate::rng::{run_rng, SimRng};
use crate::sterilization::allocate;

/// Abandoned cats arrive 70% adult / 30% kitten at these seed ages.
const ABANDONED_ADULT_FRACTION: f64 = 0.7;
const ABANDONED_ADULT_AGE: u32 = 12;
const ABANDONED_KITTEN_AGE: u32 = 2;

pub const MAX_MONTHS: u32 = 120;

/// Immutable record of one simulated month. Index 0 is the initial state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySnapshot {
    pub month: u32,
    pub total: u32,
    pub sterilized: u32,
    pub reproductive: u32,
    pub kittens: u32,
    pub births: u32,
    pub deaths: DeathReport,
    pub resource_factor: f64,
    pub carrying_capacity: f64,
    pub density_ratio: f64,
}

/// Final totals, cumulative counters, and the full monthly series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub final_population: u32,
    pub final_sterilized: u32,
    pub final_reproductive: u32,
    pub final_kittens: u32,
    pub total_births: u32,
    pub total_deaths: u32,
    pub kitten_deaths: u32,
    pub adult_deaths: u32,
    pub deaths_by_cause: DeathCauses,
    pub sterilizations_performed: u32,
    pub total_cost: f64,
    pub months: Vec<MonthlySnapshot>,
}

/// Run lifecycle. There is no pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    Running(u32),
    Completed,
    Failed,
}

pub struct SimulationEngine {
    params: ParameterSet,
    state: ColonyState,
    rng: SimRng,
    monthly_sterilization: u32,
    carried_shortfall: u32,
    run_state: RunState,
    cancel: Option<Arc<AtomicBool>>,
}

impl SimulationEngine {
    pub fn new(
        params: ParameterSet,
        state: ColonyState,
        monthly_sterilization: u32,
        rng: SimRng,
    ) -> Self {
        Self {
            params,
            state,
            rng,
            monthly_sterilization,
            carried_shortfall: 0,
            run_state: RunState::Initialized,
            cancel: None,
        }
    }

    /// Install a cooperative cancellation flag, checked between months
    /// only so snapshot invariants stay intact.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Run the colony forward `months` months.
    pub fn run(mut self, months: u32) -> SimResult<SimulationResult> {
        let mut snapshots = Vec::with_capacity(months as usize + 1);
        snapshots.push(self.observe(0, 0, DeathReport::default()));

        let mut sterilizations_performed = 0;
        for month in 0..months {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    self.run_state = RunState::Failed;
                    return Err(SimulationError::Cancelled(month));
                }
            }
            self.run_state = RunState::Running(month);
            let (snapshot, sterilized_now) = self.step(month);
            sterilizations_performed += sterilized_now;
            snapshots.push(snapshot);
        }

        self.run_state = RunState::Completed;
        finish(
            &self.state,
            &self.params,
            sterilizations_performed,
            snapshots,
        )
    }

    /// One month in the fixed order.
    fn step(&mut self, month: u32) -> (MonthlySnapshot, u32) {
        // 1. Environment from the state at month start.
        let environment = combined_factor(self.state.total(), month, &self.params);

        // 2. Mortality, kittens first.
        let deaths = apply_mortality(&mut self.state, &self.params, environment, month, &mut self.rng);
        self.state.prune();

        // 3. Abandonment arrivals at fixed seed ages.
        let arrivals = self.params.monthly_abandonment.round() as u32;
        if arrivals > 0 {
            let adults = (f64::from(arrivals) * ABANDONED_ADULT_FRACTION).round() as u32;
            push_merged(&mut self.state.reproductive, ABANDONED_ADULT_AGE, adults);
            push_merged(
                &mut self.state.young_kittens,
                ABANDONED_KITTEN_AGE,
                arrivals - adults,
            );
        }

        // 4. Sterilization with carried shortfall.
        let quota = self.monthly_sterilization + self.carried_shortfall;
        let sterilization = allocate(&mut self.state, quota);
        self.carried_shortfall = sterilization.unmet;

        // 5. Maturation; surviving kittens age one month.
        self.mature_kittens();

        // 6. Breeding: new pregnancies, then due births at age zero.
        let breeding = step_breeding(&mut self.state, &self.params, environment, month, &mut self.rng);

        // 7. Adults age one month.
        for cohort in self
            .state
            .reproductive
            .iter_mut()
            .chain(self.state.sterilized.iter_mut())
        {
            cohort.age_months += 1;
        }

        // 8. Snapshot the month-end state.
        self.state.prune();
        let snapshot = self.observe(month + 1, breeding.kittens_born, deaths);
        (snapshot, sterilization.performed())
    }

    fn mature_kittens(&mut self) {
        let maturity = self.params.maturity_months();
        let kittens = std::mem::take(&mut self.state.young_kittens);
        self.state.young_kittens = age_or_promote(kittens, maturity, &mut self.state.reproductive);
        let sterilized_kittens = std::mem::take(&mut self.state.sterilized_kittens);
        self.state.sterilized_kittens =
            age_or_promote(sterilized_kittens, maturity, &mut self.state.sterilized);
    }

    fn observe(&self, month: u32, births: u32, deaths: DeathReport) -> MonthlySnapshot {
        let total = self.state.total();
        let capacity = carrying_capacity(&self.params);
        MonthlySnapshot {
            month,
            total,
            sterilized: self.state.sterilized_count(),
            reproductive: self.state.reproductive_count(),
            kittens: self.state.kitten_count(),
            births,
            deaths,
            resource_factor: resource_availability(total, &self.params),
            carrying_capacity: capacity,
            density_ratio: f64::from(total) / capacity,
        }
    }
}

/// Build next month's kitten list: cohorts at maturity move into the
/// adult list at their current age, the rest age by one month.
fn age_or_promote(kittens: Vec<Cohort>, maturity: u32, adults: &mut Vec<Cohort>) -> Vec<Cohort> {
    let mut still_kittens = Vec::with_capacity(kittens.len());
    for cohort in kittens {
        if cohort.age_months >= maturity {
            push_merged(adults, cohort.age_months, cohort.count);
        } else {
            push_merged(&mut still_kittens, cohort.age_months + 1, cohort.count);
        }
    }
    still_kittens
}

/// Assemble the result and check the cumulative-vs-monthly invariant.
fn finish(
    state: &ColonyState,
    params: &ParameterSet,
    sterilizations_performed: u32,
    snapshots: Vec<MonthlySnapshot>,
) -> SimResult<SimulationResult> {
    let total_births: u32 = snapshots.iter().map(|s| s.births).sum();
    let kitten_deaths: u32 = snapshots.iter().map(|s| s.deaths.kittens).sum();
    let adult_deaths: u32 = snapshots.iter().map(|s| s.deaths.adults).sum();
    let mut deaths_by_cause = DeathCauses::default();
    for snapshot in &snapshots {
        deaths_by_cause.accumulate(&snapshot.deaths.causes);
    }
    let total_deaths = kitten_deaths + adult_deaths;
    if deaths_by_cause.total() != total_deaths {
        return Err(SimulationError::Run(format!(
            "cause attribution diverged from the death count ({} vs {total_deaths})",
            deaths_by_cause.total()
        )));
    }

    Ok(SimulationResult {
        final_population: state.total(),
        final_sterilized: state.sterilized_count(),
        final_reproductive: state.reproductive_count(),
        final_kittens: state.kitten_count(),
        total_births,
        total_deaths,
        kitten_deaths,
        adult_deaths,
        deaths_by_cause,
        sterilizations_performed,
        total_cost: f64::from(sterilizations_performed) * params.sterilization_cost,
        months: snapshots,
    })
}

pub(crate) fn validate_request(
    params: &ParameterSet,
    current_size: u32,
    months: u32,
    sterilized_count: u32,
) -> SimResult<()> {
    params.validate()?;
    if current_size < 1 {
        return Err(SimulationError::Validation(
            "current_size must be at least 1".into(),
        ));
    }
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err(SimulationError::Validation(format!(
            "months must lie in [1, {MAX_MONTHS}], got {months}"
        )));
    }
    if sterilized_count > current_size {
        return Err(SimulationError::Validation(format!(
            "sterilized_count {sterilized_count} exceeds current_size {current_size}"
        )));
    }
    Ok(())
}

/// Run one simulation with a caller-provided seed (reproducible).
pub fn simulate_seeded(
    params: &ParameterSet,
    current_size: u32,
    months: u32,
    sterilized_count: u32,
    monthly_sterilization: u32,
    seed: u64,
) -> SimResult<SimulationResult> {
    validate_request(params, current_size, months, sterilized_count)?;
    let mut rng = run_rng(seed);
    let state = ColonyState::initialize(current_size, sterilized_count, params, &mut rng)?;
    SimulationEngine::new(params.clone(), state, monthly_sterilization, rng).run(months)
}

/// Run one simulation with a fresh random seed.
pub fn simulate(
    params: &ParameterSet,
    current_size: u32,
    months: u32,
    sterilized_count: u32,
    monthly_sterilization: u32,
) -> SimResult<SimulationResult> {
    let seed = rand::thread_rng().gen();
    simulate_seeded(
        params,
        current_size,
        months,
        sterilized_count,
        monthly_sterilization,
        seed,
    )
}
