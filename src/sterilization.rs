//! Monthly sterilization quota allocation.
//!
//! The requested quota (this month's program plus any carried shortfall)
//! is split across reproductive adults and trap-eligible kittens in
//! proportion to each pool's share of the eligible population. Whole
//! cohorts move first; the last partially-consumed cohort is split. A
//! cohort's age never changes across the move, only its category.

use serde::{Deserialize, Serialize};

use crate::breeding::MIN_BREEDING_AGE;
use crate::colony::{push_merged, Cohort, ColonyState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SterilizationOutcome {
    pub adults: u32,
    pub kittens: u32,
    /// Quota that could not be met this month; carried to the next.
    pub unmet: u32,
}

impl SterilizationOutcome {
    pub fn performed(&self) -> u32 {
        self.adults + self.kittens
    }
}

/// Sterilize up to `requested` cats, preferring a proportional split.
pub fn allocate(state: &mut ColonyState, requested: u32) -> SterilizationOutcome {
    if requested == 0 {
        return SterilizationOutcome::default();
    }

    let eligible_kittens: u32 = state
        .young_kittens
        .iter()
        .filter(|c| c.age_months >= MIN_BREEDING_AGE)
        .map(|c| c.count)
        .sum();
    let eligible_adults = state.reproductive_count();
    let total_eligible = eligible_adults + eligible_kittens;

    let actual = requested.min(total_eligible);
    let unmet = requested - actual;
    if actual == 0 {
        return SterilizationOutcome {
            unmet,
            ..Default::default()
        };
    }

    let mut adult_quota = ((f64::from(actual) * f64::from(eligible_adults)
        / f64::from(total_eligible))
    .round() as u32)
        .min(eligible_adults)
        .min(actual);
    let mut kitten_quota = (actual - adult_quota).min(eligible_kittens);
    // Rounding can leave part of the quota unassigned; give it back to
    // whichever pool still has room.
    adult_quota += (actual - adult_quota - kitten_quota).min(eligible_adults - adult_quota);
    kitten_quota += actual - adult_quota - kitten_quota;

    let adults = drain_into(&mut state.reproductive, &mut state.sterilized, adult_quota, 0);
    let kittens = drain_into(
        &mut state.young_kittens,
        &mut state.sterilized_kittens,
        kitten_quota,
        MIN_BREEDING_AGE,
    );
    state.prune();

    SterilizationOutcome {
        adults,
        kittens,
        unmet,
    }
}

/// Move up to `quota` cats aged at least `min_age` from `source` into
/// `target`, oldest cohorts first, splitting the last cohort touched.
fn drain_into(source: &mut [Cohort], target: &mut Vec<Cohort>, quota: u32, min_age: u32) -> u32 {
    let mut remaining = quota;
    let mut order: Vec<usize> = (0..source.len())
        .filter(|&i| source[i].age_months >= min_age)
        .collect();
    order.sort_by_key(|&i| std::cmp::Reverse(source[i].age_months));

    for index in order {
        if remaining == 0 {
            break;
        }
        let cohort = &mut source[index];
        let moved = cohort.count.min(remaining);
        cohort.count -= moved;
        remaining -= moved;
        push_merged(target, cohort.age_months, moved);
    }
    quota - remaining
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colony() -> ColonyState {
        ColonyState {
            young_kittens: vec![Cohort::new(4, 2), Cohort::new(6, 5)],
            reproductive: vec![Cohort::new(10, 12), Cohort::new(8, 30)],
            ..Default::default()
        }
    }

    #[test]
    fn shortfall_is_reported_when_quota_exceeds_eligibility() {
        let mut state = colony();
        // 18 adults + 6 trap-eligible kittens.
        let outcome = allocate(&mut state, 40);
        assert_eq!(outcome.performed(), 24);
        assert_eq!(outcome.unmet, 16);
        assert_eq!(state.reproductive_count(), 0);
    }

    #[test]
    fn split_is_proportional_to_pool_shares() {
        let mut state = colony();
        let outcome = allocate(&mut state, 12);
        // Adults hold 18/24 of eligibility: 9 adults, 3 kittens.
        assert_eq!(outcome.adults, 9);
        assert_eq!(outcome.kittens, 3);
        assert_eq!(outcome.unmet, 0);
    }

    #[test]
    fn kittens_below_trap_age_are_never_taken() {
        let mut state = colony();
        allocate(&mut state, 100);
        assert!(state
            .young_kittens
            .iter()
            .all(|c| c.age_months < MIN_BREEDING_AGE));
        assert!(state
            .sterilized_kittens
            .iter()
            .all(|c| c.age_months >= MIN_BREEDING_AGE));
    }

    #[test]
    fn ages_are_preserved_across_the_move() {
        let mut state = colony();
        allocate(&mut state, 24);
        let mut sterilized_ages: Vec<u32> = state.sterilized.iter().map(|c| c.age_months).collect();
        sterilized_ages.sort();
        assert_eq!(sterilized_ages, vec![12, 30]);
        assert_eq!(state.sterilized_kittens[0].age_months, 5);
    }

    #[test]
    fn totals_are_conserved() {
        let mut state = colony();
        let before = state.total();
        allocate(&mut state, 7);
        assert_eq!(state.total(), before);
    }
}
