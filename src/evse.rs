//! Parameters for EV support equipment (chargers and associated cooling gear).
use crate::id::EvseModelID;
use crate::units::{Dimensionless, Money, Power};
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Data on one model of EV support equipment.
#[derive(Debug, Clone, Deserialize)]
pub struct EvseParams {
    /// Model name for the charger; "double" variants are detected by substring match
    pub model: EvseModelID,
    /// Rated power draw for the charger's cooling equipment
    pub cooling_cube_power: Power,
    /// Total energy conversion efficiency for the charger
    pub efficiency: Dimensionless,
    /// Power factor for the charger
    pub power_factor: Dimensionless,
    /// Monthly BaaS subscription fee per charger
    #[serde(default)]
    pub baas_monthly_rate: Option<Money>,
    /// Purchase price for a charger
    #[serde(default)]
    pub unit_price: Option<Money>,
}

impl EvseParams {
    /// Check the conversion parameters are usable as divisors.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.efficiency.is_finite()
                && self.efficiency > Dimensionless(0.0)
                && self.efficiency <= Dimensionless(1.0),
            "EVSE model {} has invalid efficiency; must be between 0 and 1",
            self.model
        );
        ensure!(
            self.power_factor.is_finite()
                && self.power_factor > Dimensionless(0.0)
                && self.power_factor <= Dimensionless(1.0),
            "EVSE model {} has invalid power factor; must be between 0 and 1",
            self.model
        );

        Ok(())
    }

    /// Whether this model is a double-headed charger variant.
    pub fn is_double_variant(&self) -> bool {
        self.model.0.contains("double")
    }

    /// The peak power draw for `unit_count` chargers of this model serving vehicles that
    /// charge at `charge_power`.
    ///
    /// Approximates simultaneous-charging diversity (not all chargers draw full rated
    /// current at once) plus fixed cooling load, normalised by conversion losses. Double
    /// variants charge two vehicles per unit and need one cooling cube each; single
    /// variants share a cooling cube between two units.
    pub fn peak_power(&self, unit_count: f64, charge_power: Power) -> Power {
        let (multiplier, rounded_units) = if self.is_double_variant() {
            (2.0, unit_count.ceil())
        } else {
            (1.0, (unit_count / 2.0).ceil())
        };

        let charging_load = Dimensionless(multiplier * unit_count / 4.0) * charge_power;
        let cooling_load = Dimensionless(rounded_units) * self.cooling_cube_power;

        (charging_load + cooling_load) / self.efficiency / self.power_factor
    }
}
