//! Environmental factors: season, carrying capacity, resources, density.
//!
//! All functions are pure in the parameter set, the current population,
//! and the month index. Bounds:
//! - `seasonal_factor` in [1 - amplitude, 1 + amplitude]
//! - `carrying_capacity` >= MIN_VIABLE_CAPACITY
//! - `resource_availability` in [MIN_RESOURCE_AVAILABILITY, 1.0]
//! - `density_impact` in (MIN_DENSITY_IMPACT, 1.0]
//! Each is monotone in its primary driver (population).

use crate::params::ParameterSet;

/// Smallest population the environment is assumed able to sustain.
pub const MIN_VIABLE_CAPACITY: f64 = 10.0;
/// Resource availability never collapses to zero, to avoid lock-up.
pub const MIN_RESOURCE_AVAILABILITY: f64 = 0.1;
/// Crowding suppression bottoms out here, however far over capacity.
pub const MIN_DENSITY_IMPACT: f64 = 0.4;

/// Baseline of one cat per this many square meters of territory.
const SQM_PER_CAT: f64 = 20.0;
const DENSITY_SIGMOID_STEEPNESS: f64 = 4.0;

/// Cosine seasonal multiplier centered on the peak breeding month.
///
/// `month` is a zero-based simulation month index; the calendar month
/// cycles through it. Low-amplitude presets keep the result near 1.
pub fn seasonal_factor(month: u32, amplitude: f64, peak_month: f64) -> f64 {
    let calendar_month = f64::from(month % 12) + 1.0;
    let phase = 2.0 * std::f64::consts::PI * (calendar_month - peak_month) / 12.0;
    1.0 + amplitude * phase.cos()
}

/// Maximum sustainable population for the configured territory.
///
/// Territory sets the baseline; food, water, shelter and caretaker
/// effort combine sub-linearly (geometric mean) so no single resource
/// dominates, and the hazard parameters compound sub-linearly into a
/// reduction. Floored at `MIN_VIABLE_CAPACITY`.
pub fn carrying_capacity(params: &ParameterSet) -> f64 {
    let baseline = params.territory_size / SQM_PER_CAT;
    let resources = [
        params.base_food_capacity * (0.6 + 0.4 * params.food_scaling_factor),
        params.water_availability,
        params.shelter_quality,
        0.5 + 0.5 * params.caretaker_support,
        0.5 + 0.5 * params.feeding_consistency,
    ];
    let resource_multiplier = resources
        .iter()
        .product::<f64>()
        .powf(1.0 / resources.len() as f64);
    let total_risk = params.urban_risk + params.disease_risk + params.natural_risk;
    let risk_multiplier = 1.0 / (1.0 + total_risk.powf(0.8));
    (baseline * resource_multiplier * risk_multiplier).max(MIN_VIABLE_CAPACITY)
}

/// How much of the colony's resource demand the territory meets.
///
/// Declines gently while under capacity and exponentially once over it;
/// the two curves meet at the capacity point.
pub fn resource_availability(population: u32, params: &ParameterSet) -> f64 {
    let capacity = carrying_capacity(params);
    let ratio = f64::from(population) / capacity;
    let availability = if ratio <= 1.0 {
        1.0 - 0.2 * ratio.powf(1.5)
    } else {
        0.8 * (-0.6 * (ratio - 1.0)).exp()
    };
    availability.max(MIN_RESOURCE_AVAILABILITY)
}

/// Crowding suppression factor in (0, 1].
///
/// Sigmoid centered where population reaches the density threshold times
/// carrying capacity: benign under capacity, asymptotically approaching
/// `MIN_DENSITY_IMPACT` far over it.
pub fn density_impact(population: u32, params: &ParameterSet) -> f64 {
    let center = carrying_capacity(params) * params.density_impact_threshold;
    let ratio = f64::from(population) / center;
    let sigmoid = 1.0 / (1.0 + (DENSITY_SIGMOID_STEEPNESS * (ratio - 1.0)).exp());
    MIN_DENSITY_IMPACT + (1.0 - MIN_DENSITY_IMPACT) * sigmoid
}

/// Blend of resource, density and (normalized) seasonal factors used by
/// the mortality and breeding models. Always in (0, 1].
pub fn combined_factor(population: u32, month: u32, params: &ParameterSet) -> f64 {
    let seasonal = seasonal_factor(
        month,
        params.seasonal_breeding_amplitude,
        params.peak_breeding_month,
    ) / (1.0 + params.seasonal_breeding_amplitude);
    let blended = 0.5 * resource_availability(population, params)
        + 0.3 * density_impact(population, params)
        + 0.2 * seasonal;
    blended.clamp(f64::MIN_POSITIVE, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::default()
    }

    #[test]
    fn seasonal_factor_peaks_at_the_peak_month() {
        let peak = seasonal_factor(3, 0.2, 4.0); // month index 3 = April
        let trough = seasonal_factor(9, 0.2, 4.0);
        assert!((peak - 1.2).abs() < 1e-9, "peak = {peak}");
        assert!(trough < 1.0, "trough = {trough}");
        for month in 0..24 {
            let factor = seasonal_factor(month, 0.2, 4.0);
            assert!((0.8..=1.2).contains(&factor), "factor = {factor}");
        }
    }

    #[test]
    fn capacity_grows_with_territory_and_never_drops_below_floor() {
        let small = {
            let mut p = params();
            p.territory_size = 1.0;
            p
        };
        let large = {
            let mut p = params();
            p.territory_size = 10_000.0;
            p
        };
        assert_eq!(carrying_capacity(&small), MIN_VIABLE_CAPACITY);
        assert!(carrying_capacity(&large) > carrying_capacity(&params()));
    }

    #[test]
    fn resource_availability_declines_monotonically_with_population() {
        let p = params();
        let mut previous = f64::INFINITY;
        for population in (0..2000).step_by(25) {
            let availability = resource_availability(population, &p);
            assert!(availability <= previous);
            assert!((MIN_RESOURCE_AVAILABILITY..=1.0).contains(&availability));
            previous = availability;
        }
    }

    #[test]
    fn density_impact_stays_in_bounds_and_declines() {
        let p = params();
        let mut previous = f64::INFINITY;
        for population in (0..5000).step_by(50) {
            let impact = density_impact(population, &p);
            assert!(impact <= previous);
            assert!(impact > MIN_DENSITY_IMPACT - 1e-9 && impact <= 1.0, "impact = {impact}");
            previous = impact;
        }
    }

    #[test]
    fn combined_factor_is_a_unit_interval_blend() {
        let p = params();
        for month in 0..120 {
            for population in [0_u32, 10, 100, 1000] {
                let factor = combined_factor(population, month, &p);
                assert!(factor > 0.0 && factor <= 1.0, "factor = {factor}");
            }
        }
    }
}
