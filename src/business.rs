//! Business-wide input parameters: energy prices, emission factors, subsidies, labour
//! rates and financial assumptions.
//!
//! Every section is optional; an absent section means the corresponding cost categories do
//! not apply and the analyses that need them are skipped.
use crate::id::RoleID;
use crate::units::{Dimensionless, MassPerEnergy, Money, MoneyPerEnergy, MoneyPerPower};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// How often a quoted rate is paid.
#[derive(Debug, Clone, Copy, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum PaymentFrequency {
    /// Quoted per year
    #[string = "annual"]
    Annual,
    /// Quoted per month
    #[string = "monthly"]
    Monthly,
}

/// Unit prices for electrical energy and peak power draw.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EnergyPricing {
    /// Price per unit of energy consumed (e.g. per kWh)
    #[serde(default)]
    pub cost_per_kwh: Option<MoneyPerEnergy>,
    /// Price per unit of peak apparent power (e.g. per kVA)
    #[serde(default)]
    pub cost_per_kva: Option<MoneyPerPower>,
}

/// Factors for greenhouse-gas accounting.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EmissionFactors {
    /// CO2-equivalent emissions per unit of grid energy consumed
    pub grid_co2e: MassPerEnergy,
}

/// Operating-cost subsidy rates.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SubsidyRates {
    /// Low-carbon fuel rebate per thousand units of energy consumed
    #[serde(default)]
    pub fuel_rebate: Option<MoneyPerEnergy>,
}

/// Employment costs per role.
#[derive(Debug, Clone, Deserialize)]
pub struct LabourRates {
    /// Rate per role, quoted at `frequency`
    pub rates: IndexMap<RoleID, Money>,
    /// How often the quoted rates are paid
    pub frequency: PaymentFrequency,
}

impl LabourRates {
    /// The monthly labour rate for `role`, converting annually quoted rates.
    pub fn monthly_rate(&self, role: &RoleID) -> Result<Money> {
        let rate = *self
            .rates
            .get(role)
            .with_context(|| format!("No labour rate configured for role {role}"))?;

        Ok(match self.frequency {
            PaymentFrequency::Annual => rate / Dimensionless(12.0),
            PaymentFrequency::Monthly => rate,
        })
    }
}

/// Financial assumptions for discounting.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FinancialParams {
    /// Annual discount rate for NPV calculations
    pub discount_rate: Dimensionless,
}

/// The full set of business parameters shared by all entities in a TCO run.
///
/// Read-only during a run; entities hold their own copies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessParams {
    /// Energy and power pricing
    #[serde(default)]
    pub energy: Option<EnergyPricing>,
    /// Emission factors
    #[serde(default)]
    pub emissions: Option<EmissionFactors>,
    /// OPEX subsidy rates
    #[serde(default)]
    pub subsidies: Option<SubsidyRates>,
    /// Labour rates by role
    #[serde(default)]
    pub labour: Option<LabourRates>,
    /// Financial assumptions
    #[serde(default)]
    pub financial: Option<FinancialParams>,
}

impl BusinessParams {
    /// Whether a per-kWh energy price is configured.
    pub fn energy_price(&self) -> Option<MoneyPerEnergy> {
        self.energy.as_ref()?.cost_per_kwh
    }

    /// Whether a per-kVA peak power price is configured.
    pub fn power_price(&self) -> Option<MoneyPerPower> {
        self.energy.as_ref()?.cost_per_kva
    }

    /// Whether a grid emission factor is configured.
    pub fn emission_factor(&self) -> Option<MassPerEnergy> {
        Some(self.emissions.as_ref()?.grid_co2e)
    }

    /// Whether a fuel-rebate subsidy rate is configured.
    pub fn fuel_rebate(&self) -> Option<MoneyPerEnergy> {
        self.subsidies.as_ref()?.fuel_rebate
    }
}
