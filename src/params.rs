//! Canonical simulation parameters.
//!
//! Every tunable knob lives here with a single source of truth for its
//! default and valid range. Callers build a `ParameterSet` from name→float
//! overrides at the API boundary; the rest of the engine trusts the
//! validated values and never re-checks them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};

/// All simulation knobs as typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Fraction of eligible females that can conceive in a breeding cycle, (0, 1].
    pub breeding_rate: f64,
    /// Mean litter size, > 0.
    pub kittens_per_litter: f64,
    /// Litters per female per year, > 0.
    pub litters_per_year: f64,
    /// Annual kitten survival rate, (0, 1].
    pub kitten_survival_rate: f64,
    /// Annual adult survival rate, (0, 1].
    pub adult_survival_rate: f64,
    /// Fraction of the colony that is female, (0, 1].
    pub female_ratio: f64,
    /// Age in months at which kittens mature into adults, >= 1.
    pub kitten_maturity_months: f64,
    /// Strength of the seasonal breeding swing, [0, 1].
    pub seasonal_breeding_amplitude: f64,
    /// Calendar month of peak breeding, [1, 12].
    pub peak_breeding_month: f64,
    /// Territory size in square meters, > 0.
    pub territory_size: f64,
    /// Population/capacity ratio where crowding starts to bite, > 0.
    pub density_impact_threshold: f64,
    /// Baseline food availability, [0, 1].
    pub base_food_capacity: f64,
    /// How strongly food scales with caretaker effort, [0, 1].
    pub food_scaling_factor: f64,
    /// Water availability, [0, 1].
    pub water_availability: f64,
    /// Shelter quality, [0, 1].
    pub shelter_quality: f64,
    /// Level of human caretaker involvement, [0, 1].
    pub caretaker_support: f64,
    /// Regularity of feeding, [0, 1].
    pub feeding_consistency: f64,
    /// Relative urban hazard (traffic, poisoning), >= 0.
    pub urban_risk: f64,
    /// Relative disease hazard, >= 0.
    pub disease_risk: f64,
    /// Relative natural hazard (predation, exposure), >= 0.
    pub natural_risk: f64,
    /// Cats abandoned into the colony per month, >= 0.
    pub monthly_abandonment: f64,
    /// Cost per sterilization surgery, >= 0.
    pub sterilization_cost: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            breeding_rate: 0.85,
            kittens_per_litter: 4.0,
            litters_per_year: 2.5,
            kitten_survival_rate: 0.75,
            adult_survival_rate: 0.90,
            female_ratio: 0.5,
            kitten_maturity_months: 6.0,
            seasonal_breeding_amplitude: 0.2,
            peak_breeding_month: 4.0,
            territory_size: 1000.0,
            density_impact_threshold: 1.2,
            base_food_capacity: 0.9,
            food_scaling_factor: 0.8,
            water_availability: 0.8,
            shelter_quality: 0.7,
            caretaker_support: 0.6,
            feeding_consistency: 0.7,
            urban_risk: 0.15,
            disease_risk: 0.1,
            natural_risk: 0.1,
            monthly_abandonment: 2.0,
            sterilization_cost: 50.0,
        }
    }
}

impl ParameterSet {
    /// Build a parameter set from name→value overrides. Unknown names are
    /// ignored, missing names keep their defaults, and the result is
    /// validated before it is returned.
    pub fn from_overrides(overrides: &HashMap<String, f64>) -> SimResult<Self> {
        let mut params = Self::default();
        for (name, value) in overrides {
            if !value.is_finite() {
                return Err(SimulationError::Validation(format!(
                    "parameter '{name}' is not a finite number"
                )));
            }
            params.apply(name, *value);
        }
        params.validate()?;
        Ok(params)
    }

    /// Set one knob by name. Returns false for unknown names.
    pub fn apply(&mut self, name: &str, value: f64) -> bool {
        match name {
            "breeding_rate" => self.breeding_rate = value,
            "kittens_per_litter" => self.kittens_per_litter = value,
            "litters_per_year" => self.litters_per_year = value,
            "kitten_survival_rate" => self.kitten_survival_rate = value,
            "adult_survival_rate" => self.adult_survival_rate = value,
            "female_ratio" => self.female_ratio = value,
            "kitten_maturity_months" => self.kitten_maturity_months = value,
            "seasonal_breeding_amplitude" => self.seasonal_breeding_amplitude = value,
            "peak_breeding_month" => self.peak_breeding_month = value,
            "territory_size" => self.territory_size = value,
            "density_impact_threshold" => self.density_impact_threshold = value,
            "base_food_capacity" => self.base_food_capacity = value,
            "food_scaling_factor" => self.food_scaling_factor = value,
            "water_availability" => self.water_availability = value,
            "shelter_quality" => self.shelter_quality = value,
            "caretaker_support" => self.caretaker_support = value,
            "feeding_consistency" => self.feeding_consistency = value,
            "urban_risk" => self.urban_risk = value,
            "disease_risk" => self.disease_risk = value,
            "natural_risk" => self.natural_risk = value,
            "monthly_abandonment" => self.monthly_abandonment = value,
            "sterilization_cost" => self.sterilization_cost = value,
            _ => return false,
        }
        true
    }

    /// Check every knob against its documented range.
    pub fn validate(&self) -> SimResult<()> {
        let checks: [(&str, f64, Range); 22] = [
            ("breeding_rate", self.breeding_rate, Range::OpenUnit),
            ("kittens_per_litter", self.kittens_per_litter, Range::Positive),
            ("litters_per_year", self.litters_per_year, Range::Positive),
            ("kitten_survival_rate", self.kitten_survival_rate, Range::OpenUnit),
            ("adult_survival_rate", self.adult_survival_rate, Range::OpenUnit),
            ("female_ratio", self.female_ratio, Range::OpenUnit),
            ("kitten_maturity_months", self.kitten_maturity_months, Range::AtLeastOne),
            (
                "seasonal_breeding_amplitude",
                self.seasonal_breeding_amplitude,
                Range::ClosedUnit,
            ),
            ("peak_breeding_month", self.peak_breeding_month, Range::Month),
            ("territory_size", self.territory_size, Range::Positive),
            (
                "density_impact_threshold",
                self.density_impact_threshold,
                Range::Positive,
            ),
            ("base_food_capacity", self.base_food_capacity, Range::ClosedUnit),
            ("food_scaling_factor", self.food_scaling_factor, Range::ClosedUnit),
            ("water_availability", self.water_availability, Range::ClosedUnit),
            ("shelter_quality", self.shelter_quality, Range::ClosedUnit),
            ("caretaker_support", self.caretaker_support, Range::ClosedUnit),
            ("feeding_consistency", self.feeding_consistency, Range::ClosedUnit),
            ("urban_risk", self.urban_risk, Range::NonNegative),
            ("disease_risk", self.disease_risk, Range::NonNegative),
            ("natural_risk", self.natural_risk, Range::NonNegative),
            ("monthly_abandonment", self.monthly_abandonment, Range::NonNegative),
            ("sterilization_cost", self.sterilization_cost, Range::NonNegative),
        ];
        for (name, value, range) in checks {
            if !value.is_finite() {
                return Err(SimulationError::Validation(format!(
                    "parameter '{name}' is not a finite number"
                )));
            }
            if !range.contains(value) {
                return Err(SimulationError::Validation(format!(
                    "parameter '{name}' = {value} is outside its valid range {}",
                    range.describe()
                )));
            }
        }
        Ok(())
    }

    /// Maturity age as whole months (validated >= 1).
    pub fn maturity_months(&self) -> u32 {
        self.kitten_maturity_months.round().max(1.0) as u32
    }
}

#[derive(Debug, Clone, Copy)]
enum Range {
    /// (0, 1]
    OpenUnit,
    /// [0, 1]
    ClosedUnit,
    /// > 0
    Positive,
    /// >= 0
    NonNegative,
    /// >= 1
    AtLeastOne,
    /// [1, 12]
    Month,
}

impl Range {
    fn contains(self, value: f64) -> bool {
        match self {
            Range::OpenUnit => value > 0.0 && value <= 1.0,
            Range::ClosedUnit => (0.0..=1.0).contains(&value),
            Range::Positive => value > 0.0,
            Range::NonNegative => value >= 0.0,
            Range::AtLeastOne => value >= 1.0,
            Range::Month => (1.0..=12.0).contains(&value),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Range::OpenUnit => "(0, 1]",
            Range::ClosedUnit => "[0, 1]",
            Range::Positive => "> 0",
            Range::NonNegative => ">= 0",
            Range::AtLeastOne => ">= 1",
            Range::Month => "[1, 12]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ParameterSet::default().validate().unwrap();
    }

    #[test]
    fn overrides_apply_and_unknown_keys_are_ignored() {
        let mut overrides = HashMap::new();
        overrides.insert("breeding_rate".to_string(), 0.5);
        overrides.insert("no_such_parameter".to_string(), 123.0);
        let params = ParameterSet::from_overrides(&overrides).unwrap();
        assert_eq!(params.breeding_rate, 0.5);
        assert_eq!(params.kittens_per_litter, ParameterSet::default().kittens_per_litter);
    }

    #[test]
    fn out_of_range_value_fails_validation() {
        let mut overrides = HashMap::new();
        overrides.insert("adult_survival_rate".to_string(), 1.5);
        let err = ParameterSet::from_overrides(&overrides).unwrap_err();
        assert!(matches!(err, SimulationError::Validation(_)));
    }

    #[test]
    fn non_finite_value_fails_validation() {
        let mut overrides = HashMap::new();
        overrides.insert("territory_size".to_string(), f64::NAN);
        let err = ParameterSet::from_overrides(&overrides).unwrap_err();
        assert!(matches!(err, SimulationError::Validation(_)));
    }

    #[test]
    fn maturity_is_whole_months() {
        let mut params = ParameterSet::default();
        params.kitten_maturity_months = 5.6;
        assert_eq!(params.maturity_months(), 6);
    }
}
