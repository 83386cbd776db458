//! Colony state: age cohorts, the pregnancy queue, and initialization.
//!
//! Cats are grouped into integer-count cohorts sharing an age; a cohort
//! belongs to exactly one reproductive category. Each simulation step
//! builds next-month cohort lists rather than mutating entries in place.

use std::collections::VecDeque;

use rand::Rng;
use rand_distr::{Distribution, Triangular};
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::params::ParameterSet;
use crate::rng::SimRng;

/// Fraction of unsterilized cats seeded as kittens.
const KITTEN_FRACTION: f64 = 0.2;
/// Fraction of reproductive females seeded as already pregnant.
const INITIAL_PREGNANCY_FRACTION: f64 = 0.15;
/// Adult age-band weights: young adult / middle-aged / mature / senior.
const AGE_BAND_WEIGHTS: [f64; 4] = [0.4, 0.3, 0.2, 0.1];
/// Upper month bounds of the synthetic adult age bands.
const AGE_BAND_EDGES: [u32; 4] = [24, 48, 72, 96];

/// A group of same-aged cats within one reproductive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub count: u32,
    pub age_months: u32,
}

impl Cohort {
    pub fn new(count: u32, age_months: u32) -> Self {
        Self { count, age_months }
    }
}

/// Cohort containers plus the FIFO pregnancy queue.
///
/// Queue position `i` holds the number of pregnant females due to give
/// birth in `i` months.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColonyState {
    pub young_kittens: Vec<Cohort>,
    pub reproductive: Vec<Cohort>,
    pub sterilized: Vec<Cohort>,
    pub sterilized_kittens: Vec<Cohort>,
    pub pregnancy_queue: VecDeque<u32>,
}

impl ColonyState {
    pub fn kitten_count(&self) -> u32 {
        count_of(&self.young_kittens) + count_of(&self.sterilized_kittens)
    }

    pub fn reproductive_count(&self) -> u32 {
        count_of(&self.reproductive)
    }

    pub fn sterilized_count(&self) -> u32 {
        count_of(&self.sterilized) + count_of(&self.sterilized_kittens)
    }

    pub fn total(&self) -> u32 {
        count_of(&self.young_kittens)
            + count_of(&self.reproductive)
            + count_of(&self.sterilized)
            + count_of(&self.sterilized_kittens)
    }

    pub fn pregnant_total(&self) -> u32 {
        self.pregnancy_queue.iter().sum()
    }

    /// Drop zero-count cohorts from every category.
    pub fn prune(&mut self) {
        self.young_kittens.retain(|c| c.count > 0);
        self.reproductive.retain(|c| c.count > 0);
        self.sterilized.retain(|c| c.count > 0);
        self.sterilized_kittens.retain(|c| c.count > 0);
    }

    /// Build an initial colony from a headcount and a sterilized count.
    pub fn initialize(
        total_cats: u32,
        sterilized_count: u32,
        params: &ParameterSet,
        rng: &mut SimRng,
    ) -> SimResult<Self> {
        if total_cats < 1 {
            return Err(SimulationError::InvalidColony(
                "colony must contain at least one cat".into(),
            ));
        }
        if sterilized_count > total_cats {
            return Err(SimulationError::InvalidColony(format!(
                "sterilized count {sterilized_count} exceeds colony size {total_cats}"
            )));
        }
        if params.kitten_maturity_months < 1.0 {
            return Err(SimulationError::InvalidColony(
                "kitten maturity must be at least one month".into(),
            ));
        }

        let maturity = params.maturity_months();
        let unsterilized = total_cats - sterilized_count;
        let mut state = ColonyState::default();

        if unsterilized == 1 {
            // A singleton is one reproductive adult, never a kitten group
            // with zero adults.
            state.reproductive.push(Cohort::new(1, maturity));
        } else if unsterilized > 1 {
            let mut kittens = (unsterilized as f64 * KITTEN_FRACTION).round() as u32;
            if unsterilized > 2 {
                kittens = kittens.max(1);
            }
            kittens = kittens.min(unsterilized - 1);
            let adults = unsterilized - kittens;

            for age in sample_kitten_ages(kittens, maturity, rng) {
                push_merged(&mut state.young_kittens, age, 1);
            }
            state.reproductive = partition_age_bands(adults, maturity, rng);
        }

        state.sterilized = partition_age_bands(sterilized_count, maturity, rng);

        let females = state.reproductive_count() as f64 * params.female_ratio;
        let pregnant = (females * INITIAL_PREGNANCY_FRACTION).round() as u32;
        if pregnant > 0 {
            state.pregnancy_queue.push_back(pregnant);
        }

        state.prune();
        Ok(state)
    }
}

/// Total count across a cohort list.
pub fn count_of(cohorts: &[Cohort]) -> u32 {
    cohorts.iter().map(|c| c.count).sum()
}

/// Add cats at an age, merging into an existing cohort of that age.
pub fn push_merged(cohorts: &mut Vec<Cohort>, age_months: u32, count: u32) {
    if count == 0 {
        return;
    }
    if let Some(existing) = cohorts.iter_mut().find(|c| c.age_months == age_months) {
        existing.count += count;
    } else {
        cohorts.push(Cohort::new(count, age_months));
    }
}

/// Split an adult group into four synthetic age bands with a uniformly
/// random age inside each band.
fn partition_age_bands(count: u32, maturity: u32, rng: &mut SimRng) -> Vec<Cohort> {
    if count == 0 {
        return Vec::new();
    }
    let mut cohorts = Vec::with_capacity(4);
    let mut remaining = count;
    let mut band_start = maturity;
    for (index, weight) in AGE_BAND_WEIGHTS.iter().enumerate() {
        let band_count = if index == AGE_BAND_WEIGHTS.len() - 1 {
            remaining
        } else {
            ((count as f64 * weight).round() as u32).min(remaining)
        };
        if band_count > 0 {
            let band_end = AGE_BAND_EDGES[index].max(band_start + 1);
            let age = rng.gen_range(band_start..band_end);
            cohorts.push(Cohort::new(band_count, age));
        }
        remaining -= band_count;
        band_start = AGE_BAND_EDGES[index].max(maturity);
        if remaining == 0 {
            break;
        }
    }
    cohorts
}

/// Kitten ages skew toward newborns: triangular with peak at zero.
fn sample_kitten_ages(count: u32, maturity: u32, rng: &mut SimRng) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let dist = Triangular::new(0.0, maturity as f64, 0.0)
        .expect("maturity is at least one month");
    (0..count)
        .map(|_| (dist.sample(rng).floor() as u32).min(maturity - 1))
        .collect()
}
