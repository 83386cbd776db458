//! Breeding: new pregnancies and delayed births via the gestation queue.
//!
//! Only unsterilized adults of breeding age contribute females. The queue
//! receives one entry per month; a pregnancy pushed in month `m` delivers
//! in month `m + GESTATION_MONTHS`.

use rand::Rng;

use crate::colony::{push_merged, ColonyState};
use crate::environment::{carrying_capacity, seasonal_factor};
use crate::params::ParameterSet;
use crate::rng::{binomial, chance, SimRng};

pub const MIN_BREEDING_AGE: u32 = 5;
pub const MAX_BREEDING_AGE: u32 = 84;
pub const GESTATION_MONTHS: usize = 2;

const MIN_MONTHLY_PROBABILITY: f64 = 0.02;
const MAX_MONTHLY_PROBABILITY: f64 = 0.4;
/// Very small colonies get a slim chance of one pregnancy even when the
/// binomial draw comes up empty, so they never stagnate permanently.
const SMALL_COLONY_LIMIT: u32 = 15;
const SMALL_COLONY_RESCUE_PROBABILITY: f64 = 0.05;

/// What one month of breeding produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreedingOutcome {
    pub new_pregnancies: u32,
    pub birthing_females: u32,
    pub kittens_born: u32,
}

/// Reproductive adults currently inside the breeding age window.
pub fn breeding_eligible(state: &ColonyState) -> u32 {
    state
        .reproductive
        .iter()
        .filter(|c| (MIN_BREEDING_AGE..=MAX_BREEDING_AGE).contains(&c.age_months))
        .map(|c| c.count)
        .sum()
}

/// Monthly conception probability, bounded to [0.02, 0.4].
///
/// Breeding responds more sharply to season than the generic seasonal
/// factor, collapses below an environment factor of 0.5, and is cut by
/// crowding above the density threshold.
pub fn breeding_probability(
    params: &ParameterSet,
    month: u32,
    environment_factor: f64,
    density_ratio: f64,
) -> f64 {
    let base = params.breeding_rate * params.litters_per_year / 12.0;

    let seasonal_swing = seasonal_factor(
        month,
        (2.0 * params.seasonal_breeding_amplitude).min(1.0),
        params.peak_breeding_month,
    );
    let seasonal = seasonal_swing.max(0.1);

    let environment = if environment_factor >= 0.5 {
        0.5 + 0.5 * environment_factor
    } else {
        1.5 * environment_factor
    };

    let threshold = params.density_impact_threshold;
    let density = if density_ratio > 2.0 * threshold {
        0.5
    } else if density_ratio > threshold {
        0.75
    } else if density_ratio < 0.5 * threshold {
        1.1
    } else {
        1.0
    };

    (base * seasonal * environment * density).clamp(MIN_MONTHLY_PROBABILITY, MAX_MONTHLY_PROBABILITY)
}

/// Draw new pregnancies, advance the gestation queue, and deliver any due
/// litters into `young_kittens` at age zero.
pub fn step_breeding(
    state: &mut ColonyState,
    params: &ParameterSet,
    environment_factor: f64,
    month: u32,
    rng: &mut SimRng,
) -> BreedingOutcome {
    let eligible = breeding_eligible(state);
    let breeding_females = (f64::from(eligible) * params.female_ratio).floor() as u32;
    let available_females = breeding_females.saturating_sub(state.pregnant_total());

    let density_ratio = f64::from(state.total()) / carrying_capacity(params);
    let probability = breeding_probability(params, month, environment_factor, density_ratio);

    let mut new_pregnancies = binomial(rng, available_females, probability);
    if new_pregnancies == 0
        && available_females > 0
        && state.total() <= SMALL_COLONY_LIMIT
        && chance(rng, SMALL_COLONY_RESCUE_PROBABILITY)
    {
        new_pregnancies = 1;
    }

    // One queue entry per month keeps the gestation clock ticking even
    // when nothing conceived.
    state.pregnancy_queue.push_back(new_pregnancies);

    let birthing_females = if state.pregnancy_queue.len() >= GESTATION_MONTHS {
        state.pregnancy_queue.pop_front().unwrap_or(0)
    } else {
        0
    };

    let kittens_born = deliver_litters(birthing_females, params, environment_factor, month, rng);
    push_merged(&mut state.young_kittens, 0, kittens_born);

    BreedingOutcome {
        new_pregnancies,
        birthing_females,
        kittens_born,
    }
}

/// Litter size per female: base adjusted by season and resources, clamped
/// to [0.6, 1.4] of base, with ±15% noise and a floor of one kitten.
fn deliver_litters(
    females: u32,
    params: &ParameterSet,
    environment_factor: f64,
    month: u32,
    rng: &mut SimRng,
) -> u32 {
    if females == 0 {
        return 0;
    }
    let base = params.kittens_per_litter;
    let seasonal = seasonal_factor(
        month,
        params.seasonal_breeding_amplitude,
        params.peak_breeding_month,
    );
    let resource = 0.7 + 0.6 * environment_factor;
    let adjusted = (base * seasonal * resource).clamp(0.6 * base, 1.4 * base);

    let mut kittens = 0;
    for _ in 0..females {
        let noise = 1.0 + rng.gen_range(-0.15..0.15);
        kittens += (adjusted * noise).round().max(1.0) as u32;
    }
    kittens
}
