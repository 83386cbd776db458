//! Cause-attributed monthly mortality.
//!
//! Annual survival rates convert to monthly mortality via
//! `1 - survival^(1/12)`. Kitten mortality is age-banded (neonatal months
//! dominate), both classes are scaled by the environment, and per-cohort
//! death counts are binomial draws so small cohorts show integer variance.

use serde::{Deserialize, Serialize};

use crate::colony::ColonyState;
use crate::params::ParameterSet;
use crate::rng::{binomial, SimRng};

/// Share floor for a cause whose risk parameter is strictly positive.
/// An exactly-zero risk attributes zero deaths to that cause.
const MIN_CAUSE_SHARE: f64 = 0.05;
/// Kitten deaths skew toward natural causes.
const KITTEN_NATURAL_SKEW: f64 = 1.5;
/// No cohort loses more than this fraction in one month.
const MAX_MONTHLY_RATE: f64 = 0.95;
/// Calendar months with elevated mortality (winter exposure).
const HIGH_RISK_MONTHS: [u32; 3] = [12, 1, 2];
const HIGH_RISK_MULTIPLIER: f64 = 1.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCauses {
    pub natural: u32,
    pub urban: u32,
    pub disease: u32,
}

impl DeathCauses {
    pub fn total(&self) -> u32 {
        self.natural + self.urban + self.disease
    }

    pub fn accumulate(&mut self, other: &DeathCauses) {
        self.natural += other.natural;
        self.urban += other.urban;
        self.disease += other.disease;
    }
}

/// One month's deaths, split by age class and by cause.
///
/// Invariant: `causes.total() == kittens + adults`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathReport {
    pub kittens: u32,
    pub adults: u32,
    pub causes: DeathCauses,
}

impl DeathReport {
    pub fn total(&self) -> u32 {
        self.kittens + self.adults
    }
}

/// Annual survival to monthly mortality.
pub fn monthly_mortality(annual_survival: f64) -> f64 {
    1.0 - annual_survival.powf(1.0 / 12.0)
}

/// Neonatal mortality dominates; the multiplier declines with age until
/// the young-adult floor.
fn kitten_age_multiplier(age_months: u32) -> f64 {
    match age_months {
        0 | 1 => 1.6,
        2 => 1.3,
        3 => 1.15,
        4 => 1.05,
        _ => 1.0,
    }
}

fn seasonal_multiplier(month: u32) -> f64 {
    let calendar_month = month % 12 + 1;
    if HIGH_RISK_MONTHS.contains(&calendar_month) {
        HIGH_RISK_MULTIPLIER
    } else {
        1.0
    }
}

/// Draw and remove this month's deaths from every cohort.
///
/// Kitten cohorts are drained first, then reproductive and sterilized
/// adults. Deaths for a cohort never exceed its count.
pub fn apply_mortality(
    state: &mut ColonyState,
    params: &ParameterSet,
    environment_factor: f64,
    month: u32,
    rng: &mut SimRng,
) -> DeathReport {
    let season = seasonal_multiplier(month);
    let shortage = (1.0 - environment_factor).max(0.0);
    let kitten_env = 1.0 + shortage * 1.5;
    let adult_env = 1.0 + shortage;

    let kitten_base = monthly_mortality(params.kitten_survival_rate);
    let adult_base = monthly_mortality(params.adult_survival_rate);

    let mut kitten_deaths = 0;
    for cohort in state
        .young_kittens
        .iter_mut()
        .chain(state.sterilized_kittens.iter_mut())
    {
        let rate = (kitten_base * kitten_age_multiplier(cohort.age_months) * kitten_env * season)
            .clamp(0.0, MAX_MONTHLY_RATE);
        let deaths = binomial(rng, cohort.count, rate);
        cohort.count -= deaths;
        kitten_deaths += deaths;
    }

    let mut adult_deaths = 0;
    for cohort in state
        .reproductive
        .iter_mut()
        .chain(state.sterilized.iter_mut())
    {
        let rate = (adult_base * adult_env * season).clamp(0.0, MAX_MONTHLY_RATE);
        let deaths = binomial(rng, cohort.count, rate);
        cohort.count -= deaths;
        adult_deaths += deaths;
    }

    let mut causes = attribute_causes(kitten_deaths, params, KITTEN_NATURAL_SKEW);
    causes.accumulate(&attribute_causes(adult_deaths, params, 1.0));

    DeathReport {
        kittens: kitten_deaths,
        adults: adult_deaths,
        causes,
    }
}

/// Split a death count across causes in proportion to the configured
/// risks, flooring strictly-positive risks at a minimum share.
fn attribute_causes(deaths: u32, params: &ParameterSet, natural_skew: f64) -> DeathCauses {
    let raw = [
        params.natural_risk * natural_skew,
        params.urban_risk,
        params.disease_risk,
    ];
    let sum: f64 = raw.iter().sum();
    let weights = if sum <= 0.0 {
        // No configured hazards: everything counts as natural.
        [1.0, 0.0, 0.0]
    } else {
        let mut shares = raw.map(|w| w / sum);
        for share in shares.iter_mut() {
            if *share > 0.0 {
                *share = share.max(MIN_CAUSE_SHARE);
            }
        }
        shares
    };
    let [natural, urban, disease] = apportion(deaths, weights);
    DeathCauses {
        natural,
        urban,
        disease,
    }
}

/// Largest-remainder apportionment: integer shares that sum to `total`.
fn apportion(total: u32, weights: [f64; 3]) -> [u32; 3] {
    let weight_sum: f64 = weights.iter().sum();
    if total == 0 || weight_sum <= 0.0 {
        return [total, 0, 0];
    }
    let exact = weights.map(|w| f64::from(total) * w / weight_sum);
    let mut shares = exact.map(|x| x.floor() as u32);
    let mut assigned: u32 = shares.iter().sum();
    let mut order: Vec<usize> = (0..3).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &index in order.iter().cycle() {
        if assigned == total {
            break;
        }
        // Never give a remainder seat to a zero-weight cause.
        if weights[index] > 0.0 {
            shares[index] += 1;
            assigned += 1;
        }
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::run_rng;

    #[test]
    fn annual_to_monthly_uses_the_twelfth_root() {
        let monthly = monthly_mortality(0.85);
        assert!((monthly - (1.0 - 0.85_f64.powf(1.0 / 12.0))).abs() < 1e-12);
        assert!(monthly < 0.15 / 12.0 * 2.0, "monthly = {monthly}");
        assert_eq!(monthly_mortality(1.0), 0.0);
    }

    #[test]
    fn neonatal_multiplier_declines_to_a_floor() {
        assert!(kitten_age_multiplier(0) > kitten_age_multiplier(2));
        assert!(kitten_age_multiplier(2) > kitten_age_multiplier(4));
        assert_eq!(kitten_age_multiplier(5), 1.0);
        assert_eq!(kitten_age_multiplier(40), 1.0);
    }

    #[test]
    fn causes_sum_to_total_deaths() {
        let params = ParameterSet::default();
        for deaths in [0, 1, 7, 100, 1234] {
            let causes = attribute_causes(deaths, &params, 1.0);
            assert_eq!(causes.total(), deaths);
        }
    }

    #[test]
    fn zero_risk_parameter_gets_zero_attribution() {
        let mut params = ParameterSet::default();
        params.disease_risk = 0.0;
        let causes = attribute_causes(500, &params, 1.0);
        assert_eq!(causes.disease, 0);
        assert_eq!(causes.total(), 500);
    }

    #[test]
    fn tiny_positive_risk_is_floored_not_zeroed() {
        let mut params = ParameterSet::default();
        params.disease_risk = 1e-6;
        let causes = attribute_causes(1000, &params, 1.0);
        assert!(causes.disease >= 40, "disease = {}", causes.disease);
    }

    #[test]
    fn deaths_never_exceed_cohort_counts() {
        let mut params = ParameterSet::default();
        params.kitten_survival_rate = 0.05;
        params.adult_survival_rate = 0.05;
        let mut rng = run_rng(9);
        let mut state = ColonyState::initialize(60, 10, &params, &mut rng).unwrap();
        let before = state.total();
        let report = apply_mortality(&mut state, &params, 0.2, 0, &mut rng);
        assert_eq!(state.total() + report.total(), before);
        assert_eq!(report.causes.total(), report.total());
    }
}
