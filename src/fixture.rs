//! Shared fixtures and helpers for unit tests.
use crate::business::{
    BusinessParams, EmissionFactors, EnergyPricing, FinancialParams, SubsidyRates,
};
use crate::entity::AnalysisWindows;
use crate::evse::EvseParams;
use crate::fleet::{FleetEntity, FleetParams, OperatingHours, VehicleParams};
use crate::maintenance::MaintenanceTierTable;
use crate::schedule::Schedule;
use crate::timeline::DateRange;
use crate::units::{
    Dimensionless, EnergyPerHour, Hours, MassPerEnergy, Money, MoneyPerEnergy, MoneyPerPower,
    Power,
};
use chrono::NaiveDate;
use indexmap::indexmap;
use rstest::fixture;

/// Assert that a result is an error whose outermost message equals the given string.
macro_rules! assert_error {
    ($result:expr, $expected_message:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $expected_message
        )
    };
}
pub(crate) use assert_error;

/// Parse an ISO date string. Panics on bad input; for test literals only.
pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// A two-month analysis window used for both CAPEX and OPEX.
#[fixture]
pub fn two_month_windows() -> AnalysisWindows {
    let range = DateRange {
        start: date("2022-01-01"),
        end: date("2022-02-01"),
    };
    AnalysisWindows {
        capex: Some(range),
        opex: Some(range),
    }
}

/// A four-tier maintenance table with one component and equal 250-hour intervals.
#[fixture]
pub fn maintenance_table() -> MaintenanceTierTable {
    MaintenanceTierTable::new(
        vec![Hours(250.0), Hours(500.0), Hours(750.0), Hours(1000.0)],
        indexmap! {
            "Major Components".into() => vec![
                Money(10_000.0),
                Money(20_000.0),
                Money(25_000.0),
                Money(30_000.0),
            ],
        },
    )
    .unwrap()
}

/// Business parameters with every cost category configured except labour.
#[fixture]
pub fn business_params() -> BusinessParams {
    BusinessParams {
        energy: Some(EnergyPricing {
            cost_per_kwh: Some(MoneyPerEnergy(0.05)),
            cost_per_kva: Some(MoneyPerPower(10.0)),
        }),
        emissions: Some(EmissionFactors {
            grid_co2e: MassPerEnergy(10.0),
        }),
        subsidies: Some(SubsidyRates {
            fuel_rebate: Some(MoneyPerEnergy(150.0)),
        }),
        labour: None,
        financial: Some(FinancialParams {
            discount_rate: Dimensionless(0.1),
        }),
    }
}

/// A leased single-headed charger with no purchase price.
#[fixture]
pub fn evse_params() -> EvseParams {
    EvseParams {
        model: "single charger".into(),
        cooling_cube_power: Power(50.0),
        efficiency: Dimensionless(0.9),
        power_factor: Dimensionless(0.9),
        baas_monthly_rate: Some(Money(10_000.0)),
        unit_price: None,
    }
}

/// One vehicle operating 100 hours in each of January and February 2022.
#[fixture]
pub fn op_hours() -> OperatingHours {
    OperatingHours::new(
        vec![date("2022-01-01"), date("2022-02-01")],
        indexmap! {"LHD-1".into() => vec![Hours(100.0), Hours(100.0)]},
    )
    .unwrap()
}

/// A single-vehicle fleet with every cost category configured.
#[fixture]
pub fn fleet_entity(
    business_params: BusinessParams,
    evse_params: EvseParams,
    maintenance_table: MaintenanceTierTable,
    op_hours: OperatingHours,
    two_month_windows: AnalysisWindows,
) -> FleetEntity {
    let fleet = FleetParams {
        vehicle_count: 1,
        purchase_schedule: Some(Schedule::from_pairs(&[
            (date("2022-01-01"), 0.2),
            (date("2022-02-01"), 0.8),
        ])),
        subsidy_schedule: Some(Schedule::from_pairs(&[(date("2022-02-01"), 0.1)])),
    };
    let vehicle = VehicleParams {
        unit_price: Money(500_000.0),
        energy_consumption: Some(EnergyPerHour(50.0)),
        charging_power: Some(Power(200.0)),
        baas_monthly_rate: Some(Money(1000.0)),
        maintenance: Some(maintenance_table),
    };

    FleetEntity::new(
        fleet,
        vehicle,
        Some(evse_params),
        business_params,
        op_hours,
        &two_month_windows,
        None,
    )
    .unwrap()
}
