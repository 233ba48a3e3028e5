//! The fleet entity: CAPEX and OPEX analysis for a homogeneous group of vehicles.
//!
//! An instance represents one make/model of vehicle; a mixed fleet is modelled as several
//! fleet entities. OPEX covers energy, peak power, BaaS subscriptions, maintenance, GHG
//! emissions and fuel-rebate subsidies; CAPEX covers the vehicle purchase schedule and any
//! purchase subsidies.
use crate::business::BusinessParams;
use crate::entity::{AnalysisWindows, CostEntity, EntityKind};
use crate::evse::EvseParams;
use crate::id::VehicleID;
use crate::maintenance::MaintenanceTierTable;
use crate::registry::VariableRegistry;
use crate::schedule::{Schedule, allocate};
use crate::timeline::{CostSeries, Timeline};
use crate::units::{Dimensionless, Energy, EnergyPerHour, Hours, Money, Power};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;
use std::rc::Rc;

/// Variable name for the fleet's total monthly operating hours.
pub const OPERATING_HOURS: &str = "operating hours";
/// Variable name for the number of vehicles in service each month.
pub const VEHICLES_REQUIRED: &str = "vehicles required";
/// Variable name for monthly energy consumption.
pub const ENERGY_CONSUMPTION: &str = "energy consumption";
/// Variable name for monthly energy costs.
pub const ENERGY_COSTS: &str = "energy costs";
/// Variable name for monthly peak power consumption.
pub const POWER_CONSUMPTION: &str = "power consumption";
/// Variable name for monthly peak power costs.
pub const POWER_COSTS: &str = "power costs";
/// Variable name for monthly BaaS subscription costs.
pub const BAAS_COSTS: &str = "baas costs";
/// Variable name for the fleet's total monthly maintenance costs.
pub const MAINTENANCE_COSTS: &str = "maintenance costs";
/// Variable name for monthly GHG emissions.
pub const EMISSIONS: &str = "emissions";
/// Variable name for monthly OPEX subsidies (a negative cost).
pub const OPEX_SUBSIDIES: &str = "opex subsidies";
/// Variable name for the fleet purchase cost series.
pub const FLEET_CAPEX: &str = "fleet capex";
/// Variable name for CAPEX subsidies (a negative cost).
pub const CAPEX_SUBSIDIES: &str = "capex subsidies";

/// Parameters describing the fleet to be analysed.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetParams {
    /// Number of vehicles in the fleet
    pub vehicle_count: u32,
    /// Dates and fractions at which the fleet purchase cost falls due
    #[serde(default)]
    pub purchase_schedule: Option<Schedule>,
    /// Dates and fractions (of the purchase cost) at which CAPEX subsidies are credited
    #[serde(default)]
    pub subsidy_schedule: Option<Schedule>,
}

/// Parameters describing the vehicle type making up the fleet.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleParams {
    /// Purchase price of one vehicle
    pub unit_price: Money,
    /// Average energy consumption while operating
    #[serde(default)]
    pub energy_consumption: Option<EnergyPerHour>,
    /// Charging power drawn by one vehicle
    #[serde(default)]
    pub charging_power: Option<Power>,
    /// Monthly BaaS fee per vehicle
    #[serde(default)]
    pub baas_monthly_rate: Option<Money>,
    /// Maintenance interval cost table
    #[serde(default)]
    pub maintenance: Option<MaintenanceTierTable>,
}

/// The operating hours recorded per vehicle per month.
///
/// A recorded value of zero means the vehicle was not in service that month. Months absent
/// from the table contribute zero hours.
#[derive(Debug, Clone)]
pub struct OperatingHours {
    dates: Vec<NaiveDate>,
    hours: IndexMap<VehicleID, Vec<Hours>>,
}

impl OperatingHours {
    /// Create an operating-hours table from a date column and per-vehicle hour columns.
    pub fn new(dates: Vec<NaiveDate>, hours: IndexMap<VehicleID, Vec<Hours>>) -> Result<Self> {
        ensure!(
            crate::utils::is_sorted_and_unique(&dates),
            "Operating-hours dates must be in order and unique"
        );
        for (vehicle, values) in &hours {
            ensure!(
                values.len() == dates.len(),
                "Vehicle {vehicle} has {} operating-hours entries for {} months",
                values.len(),
                dates.len()
            );
        }

        Ok(OperatingHours { dates, hours })
    }

    /// The vehicle identifiers in the table.
    pub fn vehicle_ids(&self) -> impl Iterator<Item = &VehicleID> {
        self.hours.keys()
    }

    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Total hours operated across all vehicles in the month starting at `date`.
    pub fn total_hours_in(&self, date: NaiveDate) -> Hours {
        match self.index_of(date) {
            Some(index) => self.hours.values().map(|values| values[index]).sum(),
            None => Hours(0.0),
        }
    }

    /// The number of vehicles with nonzero recorded hours in the month starting at `date`.
    ///
    /// Zero recorded hours is treated as "not in service", not "idle".
    pub fn vehicles_in_service(&self, date: NaiveDate) -> u32 {
        match self.index_of(date) {
            Some(index) => self
                .hours
                .values()
                .filter(|values| values[index] != Hours(0.0))
                .count() as u32,
            None => 0,
        }
    }

    /// Hours operated by `vehicle` in the month starting at `date`.
    pub fn hours_in(&self, vehicle: &VehicleID, date: NaiveDate) -> Hours {
        match self.index_of(date) {
            Some(index) => self.hours[vehicle][index],
            None => Hours(0.0),
        }
    }

    /// Cumulative hours operated by `vehicle` through the month starting at `date`
    /// (inclusive).
    pub fn cumulative_hours_through(&self, vehicle: &VehicleID, date: NaiveDate) -> Hours {
        self.dates
            .iter()
            .zip(&self.hours[vehicle])
            .take_while(|(d, _)| **d <= date)
            .map(|(_, hours)| *hours)
            .sum()
    }
}

/// A homogeneous group of vehicles and the equipment and business context they operate in.
#[derive(Debug)]
pub struct FleetEntity {
    fleet: FleetParams,
    vehicle: VehicleParams,
    evse: Option<EvseParams>,
    business: BusinessParams,
    op_hours: OperatingHours,
    location: Option<String>,
    capex_timeline: Option<Rc<Timeline>>,
    opex_timeline: Option<Rc<Timeline>>,
    registry: VariableRegistry,
}

impl FleetEntity {
    /// Create a fleet entity, building its analysis timelines up front.
    ///
    /// The fleet's operating-hours and vehicles-in-service series are registered
    /// immediately when an OPEX window is configured; cost series are registered by the
    /// analysis methods.
    pub fn new(
        fleet: FleetParams,
        vehicle: VehicleParams,
        evse: Option<EvseParams>,
        business: BusinessParams,
        op_hours: OperatingHours,
        windows: &AnalysisWindows,
        location: Option<String>,
    ) -> Result<Self> {
        if let Some(evse) = &evse {
            evse.validate()?;
        }

        let capex_timeline = windows
            .capex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;
        let opex_timeline = windows
            .opex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;

        let mut entity = FleetEntity {
            fleet,
            vehicle,
            evse,
            business,
            op_hours,
            location,
            capex_timeline,
            opex_timeline,
            registry: VariableRegistry::new(),
        };

        if let Some(timeline) = &entity.opex_timeline {
            let mut hours = CostSeries::zeros(OPERATING_HOURS, timeline);
            let mut in_service = CostSeries::zeros(VEHICLES_REQUIRED, timeline);
            for (index, date) in timeline.dates().iter().enumerate() {
                hours.set(index, entity.op_hours.total_hours_in(*date).value());
                in_service.set(index, entity.op_hours.vehicles_in_service(*date) as f64);
            }
            entity.registry.add(hours);
            entity.registry.add(in_service);
        }

        Ok(entity)
    }

    /// Monthly energy consumed by the fleet: total operating hours times the average
    /// consumption rate.
    fn energy_consumption_series(&self, timeline: &Rc<Timeline>, rate: EnergyPerHour) -> CostSeries {
        let mut series = CostSeries::zeros(ENERGY_CONSUMPTION, timeline);
        for (index, date) in timeline.dates().iter().enumerate() {
            let consumed = rate * self.op_hours.total_hours_in(*date);
            series.set(index, consumed.value());
        }
        series
    }

    /// Monthly peak power drawn by the chargers serving the vehicles in service.
    fn power_consumption_series(
        &self,
        timeline: &Rc<Timeline>,
        evse: &EvseParams,
        charge_power: Power,
    ) -> CostSeries {
        let mut series = CostSeries::zeros(POWER_CONSUMPTION, timeline);
        for (index, date) in timeline.dates().iter().enumerate() {
            let unit_count = self.op_hours.vehicles_in_service(*date) as f64;
            series.set(index, evse.peak_power(unit_count, charge_power).value());
        }
        series
    }

    /// Monthly BaaS costs: vehicles in service times the combined vehicle and charger
    /// subscription rates.
    fn baas_cost_series(
        &self,
        timeline: &Rc<Timeline>,
        vehicle_rate: Money,
        charger_rate: Money,
    ) -> CostSeries {
        let mut series = CostSeries::zeros(BAAS_COSTS, timeline);
        for (index, date) in timeline.dates().iter().enumerate() {
            let in_service = self.op_hours.vehicles_in_service(*date) as f64;
            let cost = Dimensionless(in_service) * (vehicle_rate + charger_rate);
            series.set(index, cost.value());
        }
        series
    }

    /// Monthly maintenance cost per vehicle, plus the fleet total.
    ///
    /// The tier lookup uses each vehicle's cumulative hours through the month; the rate is
    /// applied to that month's usage only.
    fn maintenance_cost_series(
        &self,
        timeline: &Rc<Timeline>,
        table: &MaintenanceTierTable,
    ) -> (Vec<CostSeries>, CostSeries) {
        let mut total = CostSeries::zeros(MAINTENANCE_COSTS, timeline);
        let mut per_vehicle = Vec::new();

        for vehicle in self.op_hours.vehicle_ids() {
            let mut series = CostSeries::zeros(&vehicle.0, timeline);
            for (index, date) in timeline.dates().iter().enumerate() {
                let cumulative = self.op_hours.cumulative_hours_through(vehicle, *date);
                let usage = self.op_hours.hours_in(vehicle, *date);
                let cost = table.cost_for_usage(cumulative, usage);
                series.set(index, cost.value());
                total.set(index, total.values()[index] + cost.value());
            }
            per_vehicle.push(series);
        }

        (per_vehicle, total)
    }
}

/// Scale a consumption-style series by a rate, producing a new named series.
fn scaled_series(name: &str, source: &CostSeries, scale: impl Fn(f64) -> f64) -> CostSeries {
    let mut series = CostSeries::zeros(name, source.timeline());
    for (index, value) in source.values().iter().enumerate() {
        series.set(index, scale(*value));
    }
    series
}

impl CostEntity for FleetEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Fleet
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    fn has_opex_window(&self) -> bool {
        self.opex_timeline.is_some()
    }

    fn has_capex_window(&self) -> bool {
        self.capex_timeline.is_some()
    }

    /// Calculate the fleet's operating costs.
    ///
    /// Each cost category is gated on the presence of its input parameters; an absent
    /// parameter means the category does not apply and is skipped.
    fn compute_opex(&mut self) -> Result<()> {
        let timeline = self
            .opex_timeline
            .clone()
            .context("No OPEX analysis window configured for fleet entity")?;

        // Energy consumption underpins the energy cost, emissions and subsidy series
        let mut consumption = None;
        if let Some(rate) = self.vehicle.energy_consumption {
            let series = self.energy_consumption_series(&timeline, rate);
            consumption = Some(self.registry.add(series));
        }

        if let (Some(consumption), Some(price)) = (&consumption, self.business.energy_price()) {
            let costs = scaled_series(ENERGY_COSTS, consumption, |energy| {
                (price * Energy(energy)).value()
            });
            self.registry.add_opex(costs);
        }

        if let (Some(evse), Some(charge_power), Some(price)) = (
            self.evse.clone(),
            self.vehicle.charging_power,
            self.business.power_price(),
        ) {
            let consumed = self.power_consumption_series(&timeline, &evse, charge_power);
            let consumed = self.registry.add(consumed);
            let costs = scaled_series(POWER_COSTS, &consumed, |power| {
                (price * Power(power)).value()
            });
            self.registry.add_opex(costs);
        }

        if let Some(vehicle_rate) = self.vehicle.baas_monthly_rate {
            let charger_rate = self
                .evse
                .as_ref()
                .and_then(|evse| evse.baas_monthly_rate)
                .unwrap_or(Money(0.0));
            let costs = self.baas_cost_series(&timeline, vehicle_rate, charger_rate);
            self.registry.add_opex(costs);
        }

        if let Some(table) = self.vehicle.maintenance.clone() {
            let (per_vehicle, total) = self.maintenance_cost_series(&timeline, &table);
            for series in per_vehicle {
                self.registry.add(series);
            }
            self.registry.add_opex(total);
        }

        if let (Some(consumption), Some(factor)) = (&consumption, self.business.emission_factor())
        {
            let emissions = scaled_series(EMISSIONS, consumption, |energy| {
                (factor * Energy(energy) / Dimensionless(1000.0)).value()
            });
            self.registry.add(emissions);
        }

        if let (Some(consumption), Some(rebate)) = (&consumption, self.business.fuel_rebate()) {
            let subsidies = scaled_series(OPEX_SUBSIDIES, consumption, |energy| {
                -(rebate * Energy(energy) / Dimensionless(1000.0)).value()
            });
            self.registry.add_opex(subsidies);
        }

        Ok(())
    }

    /// Calculate the fleet's capital costs: the purchase schedule and any purchase
    /// subsidies, both allocated onto the CAPEX timeline.
    fn compute_capex(&mut self) -> Result<()> {
        let timeline = self
            .capex_timeline
            .clone()
            .context("No CAPEX analysis window configured for fleet entity")?;

        let total = Dimensionless(self.fleet.vehicle_count as f64) * self.vehicle.unit_price;

        if let Some(schedule) = &self.fleet.purchase_schedule {
            let series = allocate(&timeline, schedule, FLEET_CAPEX, total)?;
            self.registry.add_capex(series);
        }

        if let Some(schedule) = &self.fleet.subsidy_schedule {
            let series = allocate(&timeline, schedule, CAPEX_SUBSIDIES, -total)?;
            self.registry.add_capex(series);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, date, fleet_entity};
    use float_cmp::assert_approx_eq;
    use indexmap::indexmap;
    use rstest::rstest;

    fn series_values(entity: &FleetEntity, name: &str) -> Vec<f64> {
        entity.registry().get(name).unwrap().values().to_vec()
    }

    #[rstest]
    fn test_energy_consumption_and_costs(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        // 100 hours/month at 50 kWh/hr
        assert_eq!(
            series_values(&fleet_entity, ENERGY_CONSUMPTION),
            vec![5000.0, 5000.0]
        );
        // 5000 kWh at 0.05/kWh
        assert_eq!(series_values(&fleet_entity, ENERGY_COSTS), vec![250.0, 250.0]);
    }

    #[rstest]
    fn test_emissions(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        // 5000 kWh * 10.0 / 1000
        assert_eq!(series_values(&fleet_entity, EMISSIONS), vec![50.0, 50.0]);
    }

    #[rstest]
    fn test_opex_subsidies(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        // -(5000 kWh * 150 / 1000)
        assert_eq!(
            series_values(&fleet_entity, OPEX_SUBSIDIES),
            vec![-750.0, -750.0]
        );
    }

    #[rstest]
    fn test_baas_costs(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        // One vehicle in service at 1000 + 10000 per month
        assert_eq!(
            series_values(&fleet_entity, BAAS_COSTS),
            vec![11_000.0, 11_000.0]
        );
    }

    #[rstest]
    fn test_maintenance_costs(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        // Cumulative hours stay within tier 0 (rate 10000/250 = 40/hr) both months
        assert_eq!(
            series_values(&fleet_entity, MAINTENANCE_COSTS),
            vec![4000.0, 4000.0]
        );
        // The per-vehicle breakdown is registered under the vehicle's ID
        assert_eq!(series_values(&fleet_entity, "LHD-1"), vec![4000.0, 4000.0]);
    }

    #[rstest]
    fn test_power_consumption_and_costs(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_opex().unwrap();

        let peak = 100.0 / 0.9 / 0.9;
        let power = series_values(&fleet_entity, POWER_CONSUMPTION);
        assert_approx_eq!(f64, power[0], peak);
        assert_approx_eq!(f64, power[1], peak);

        let costs = series_values(&fleet_entity, POWER_COSTS);
        assert_approx_eq!(f64, costs[0], peak * 10.0);
    }

    #[rstest]
    fn test_fleet_capex_and_subsidies(mut fleet_entity: FleetEntity) {
        fleet_entity.compute_capex().unwrap();

        // 500000 split 20/80 over the two months
        assert_eq!(
            series_values(&fleet_entity, FLEET_CAPEX),
            vec![100_000.0, 400_000.0]
        );
        // 10% subsidy credited in month two
        assert_eq!(
            series_values(&fleet_entity, CAPEX_SUBSIDIES),
            vec![0.0, -50_000.0]
        );
    }

    #[rstest]
    fn test_execute_is_idempotent(mut fleet_entity: FleetEntity) {
        fleet_entity.execute().unwrap();
        let first = series_values(&fleet_entity, ENERGY_COSTS);
        fleet_entity.execute().unwrap();
        assert_eq!(series_values(&fleet_entity, ENERGY_COSTS), first);
    }

    #[rstest]
    fn test_absent_parameters_skip_categories(fleet_entity: FleetEntity) {
        let mut entity = FleetEntity::new(
            FleetParams {
                vehicle_count: 1,
                purchase_schedule: None,
                subsidy_schedule: None,
            },
            VehicleParams {
                unit_price: Money(500_000.0),
                energy_consumption: None,
                charging_power: None,
                baas_monthly_rate: None,
                maintenance: None,
            },
            None,
            BusinessParams::default(),
            fleet_entity.op_hours.clone(),
            &AnalysisWindows {
                capex: fleet_entity.capex_timeline.as_ref().map(|t| {
                    crate::timeline::DateRange {
                        start: t.start(),
                        end: t.end(),
                    }
                }),
                opex: fleet_entity.opex_timeline.as_ref().map(|t| {
                    crate::timeline::DateRange {
                        start: t.start(),
                        end: t.end(),
                    }
                }),
            },
            None,
        )
        .unwrap();

        entity.execute().unwrap();
        assert!(entity.registry().get(ENERGY_COSTS).is_none());
        assert!(entity.registry().get(BAAS_COSTS).is_none());
        assert!(entity.registry().get(FLEET_CAPEX).is_none());
        assert!(entity.registry().opex_variables().is_empty());
        assert!(entity.registry().capex_variables().is_empty());
    }

    #[rstest]
    fn test_missing_windows_fail_direct_calls(fleet_entity: FleetEntity) {
        let mut entity = FleetEntity::new(
            fleet_entity.fleet.clone(),
            fleet_entity.vehicle.clone(),
            fleet_entity.evse.clone(),
            fleet_entity.business.clone(),
            fleet_entity.op_hours.clone(),
            &AnalysisWindows::default(),
            None,
        )
        .unwrap();

        assert_error!(
            entity.compute_opex(),
            "No OPEX analysis window configured for fleet entity"
        );
        assert_error!(
            entity.compute_capex(),
            "No CAPEX analysis window configured for fleet entity"
        );

        // execute() skips analyses with no window rather than failing
        entity.execute().unwrap();
        assert!(entity.registry().variables().is_empty());
    }

    #[test]
    fn test_zero_hours_means_not_in_service() {
        let op_hours = OperatingHours::new(
            vec![date("2022-01-01"), date("2022-02-01")],
            indexmap! {
                "LHD-1".into() => vec![Hours(100.0), Hours(0.0)],
                "LHD-2".into() => vec![Hours(50.0), Hours(75.0)],
            },
        )
        .unwrap();

        assert_eq!(op_hours.vehicles_in_service(date("2022-01-01")), 2);
        assert_eq!(op_hours.vehicles_in_service(date("2022-02-01")), 1);
        // Months absent from the table contribute nothing
        assert_eq!(op_hours.vehicles_in_service(date("2022-03-01")), 0);
        assert_eq!(op_hours.total_hours_in(date("2022-01-01")), Hours(150.0));

        let lhd1 = "LHD-1".into();
        assert_eq!(
            op_hours.cumulative_hours_through(&lhd1, date("2022-02-01")),
            Hours(100.0)
        );
    }

    #[test]
    fn test_operating_hours_validation() {
        assert_error!(
            OperatingHours::new(
                vec![date("2022-02-01"), date("2022-01-01")],
                indexmap! {"LHD-1".into() => vec![Hours(1.0), Hours(2.0)]},
            ),
            "Operating-hours dates must be in order and unique"
        );
        assert_error!(
            OperatingHours::new(
                vec![date("2022-01-01"), date("2022-02-01")],
                indexmap! {"LHD-1".into() => vec![Hours(1.0)]},
            ),
            "Vehicle LHD-1 has 1 operating-hours entries for 2 months"
        );
    }
}
