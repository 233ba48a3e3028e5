//! The infrastructure entity: site construction and charging equipment for a BEV
//! operation.
use crate::entity::{AnalysisWindows, CostEntity, EntityKind};
use crate::evse::EvseParams;
use crate::id::{EvseModelID, IDCollection};
use crate::registry::VariableRegistry;
use crate::schedule::{Schedule, allocate};
use crate::timeline::{CostSeries, DateRange, Timeline};
use crate::units::{Dimensionless, Length, Money};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::rc::Rc;

/// Variable name for site construction costs.
pub const CONSTRUCTION_COSTS: &str = "charging station costs";
/// Variable name for charging equipment purchase costs.
pub const EQUIPMENT_CAPEX: &str = "equipment capex";
/// Variable name for charger BaaS subscription costs.
pub const BAAS_COSTS: &str = "baas costs";

/// The kind of site being built.
#[derive(Debug, Clone, Copy, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum InfrastructureKind {
    /// An underground or surface charging station
    #[string = "charging station"]
    ChargingStation,
}

/// A charger BaaS subscription and the period it runs for.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BaasSubscription {
    /// How often the subscription is billed
    pub frequency: crate::business::PaymentFrequency,
    /// The period the subscription runs for
    pub window: DateRange,
}

/// Parameters describing one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteParams {
    /// What is being built
    pub kind: InfrastructureKind,
    /// Length of cable to pull to the site
    pub cable_length: Length,
    /// Number of battery-swap/charging bays at the site
    pub battery_bays: u32,
    /// Chargers installed at the site, by model
    pub evse_stock: IndexMap<EvseModelID, f64>,
    /// Dates and fractions at which construction costs fall due; when absent the full
    /// cost falls due in the CAPEX window's first month
    #[serde(default)]
    pub construction_schedule: Option<Schedule>,
    /// Dates and fractions at which equipment costs fall due
    #[serde(default)]
    pub equipment_schedule: Option<Schedule>,
    /// Charger BaaS subscription, if the chargers are leased rather than bought
    #[serde(default)]
    pub baas: Option<BaasSubscription>,
}

/// Facility-level construction rates shared by the operation's sites.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FacilityParams {
    /// Development cost per pair of battery bays
    pub development_cost: Money,
    /// Cost per unit length of cable pulled
    pub cable_pull_rate: crate::units::MoneyPerLength,
}

/// A site plus the charger catalog and facility rates needed to cost it.
#[derive(Debug)]
pub struct InfrastructureEntity {
    site: SiteParams,
    facility: Option<FacilityParams>,
    evse_catalog: IndexMap<EvseModelID, EvseParams>,
    location: Option<String>,
    capex_timeline: Option<Rc<Timeline>>,
    opex_timeline: Option<Rc<Timeline>>,
    registry: VariableRegistry,
}

impl InfrastructureEntity {
    /// Create an infrastructure entity, checking the site's charger stock against the
    /// catalog and building its analysis timelines up front.
    pub fn new(
        site: SiteParams,
        facility: Option<FacilityParams>,
        evse_catalog: IndexMap<EvseModelID, EvseParams>,
        windows: &AnalysisWindows,
        location: Option<String>,
    ) -> Result<Self> {
        for model in site.evse_stock.keys() {
            evse_catalog.get_id(model)?;
        }

        let capex_timeline = windows
            .capex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;
        let opex_timeline = windows
            .opex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;

        Ok(InfrastructureEntity {
            site,
            facility,
            evse_catalog,
            location,
            capex_timeline,
            opex_timeline,
            registry: VariableRegistry::new(),
        })
    }

    /// Total construction cost: bay development (bays come in pairs) plus cable pulling.
    fn construction_cost(&self, facility: &FacilityParams) -> Money {
        let bay_pairs = Dimensionless(f64::from(self.site.battery_bays) / 2.0);
        bay_pairs * facility.development_cost
            + facility.cable_pull_rate * self.site.cable_length
    }

    /// Total equipment cost: each charger model's stock times its catalog unit price.
    fn equipment_cost(&self) -> Result<Money> {
        let mut total = Money(0.0);
        for (model, count) in &self.site.evse_stock {
            let price = self.evse_catalog[model]
                .unit_price
                .with_context(|| format!("EVSE model {model} has no unit price configured"))?;
            total += Dimensionless(*count) * price;
        }
        Ok(total)
    }

    /// Allocate `total` by `schedule`, or place it in the timeline's first month when no
    /// schedule is given.
    fn allocate_or_front_load(
        timeline: &Rc<Timeline>,
        schedule: Option<&Schedule>,
        name: &str,
        total: Money,
    ) -> Result<CostSeries> {
        match schedule {
            Some(schedule) => allocate(timeline, schedule, name, total),
            None => {
                let mut series = CostSeries::zeros(name, timeline);
                series.add_at(timeline.start(), total.value())?;
                Ok(series)
            }
        }
    }
}

impl CostEntity for InfrastructureEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Infrastructure
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

    /// Monthly charger BaaS costs over the subscription's window.
    ///
    /// Only monthly-billed subscriptions produce costs; months outside the subscription
    /// window stay zero.
    fn compute_opex(&mut self) -> Result<()> {
        let timeline = self
            .opex_timeline
            .clone()
            .context("No OPEX analysis window configured for infrastructure entity")?;

        let Some(subscription) = self.site.baas else {
            return Ok(());
        };
        if subscription.frequency != crate::business::PaymentFrequency::Monthly {
            return Ok(());
        }

        let monthly: Money = self
            .site
            .evse_stock
            .iter()
            .filter_map(|(model, count)| {
                let rate = self.evse_catalog[model].baas_monthly_rate?;
                Some(Dimensionless(*count) * rate)
            })
            .sum();

        let mut series = CostSeries::zeros(BAAS_COSTS, &timeline);
        for (index, date) in timeline.dates().iter().enumerate() {
            if *date >= subscription.window.start && *date <= subscription.window.end {
                series.set(index, monthly.value());
            }
        }
        self.registry.add_opex(series);

        Ok(())
    }

    /// Site construction and charging equipment costs, allocated onto the CAPEX timeline.
    fn compute_capex(&mut self) -> Result<()> {
        let timeline = self
            .capex_timeline
            .clone()
            .context("No CAPEX analysis window configured for infrastructure entity")?;

        if let Some(facility) = self.facility {
            let total = self.construction_cost(&facility);
            let series = Self::allocate_or_front_load(
                &timeline,
                self.site.construction_schedule.as_ref(),
                CONSTRUCTION_COSTS,
                total,
            )?;
            self.registry.add_capex(series);
        }

        if !self.site.evse_stock.is_empty() {
            let total = self.equipment_cost()?;
            let series = Self::allocate_or_front_load(
                &timeline,
                self.site.equipment_schedule.as_ref(),
                EQUIPMENT_CAPEX,
                total,
            )?;
            self.registry.add_capex(series);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::PaymentFrequency;
    use crate::fixture::{assert_error, date, evse_params, two_month_windows};
    use indexmap::indexmap;
    use rstest::rstest;

    fn catalog(evse_params: &EvseParams) -> IndexMap<EvseModelID, EvseParams> {
        indexmap! {evse_params.model.clone() => evse_params.clone()}
    }

    fn site(evse_params: &EvseParams) -> SiteParams {
        SiteParams {
            kind: InfrastructureKind::ChargingStation,
            cable_length: Length(100.0),
            battery_bays: 2,
            evse_stock: indexmap! {evse_params.model.clone() => 5.0},
            construction_schedule: None,
            equipment_schedule: None,
            baas: None,
        }
    }

    fn facility() -> FacilityParams {
        FacilityParams {
            development_cost: Money(100_000.0),
            cable_pull_rate: crate::units::MoneyPerLength(100.0),
        }
    }

    #[rstest]
    fn test_construction_and_equipment_capex(
        evse_params: EvseParams,
        two_month_windows: AnalysisWindows,
    ) {
        let evse_params = EvseParams {
            unit_price: Some(Money(10_000.0)),
            ..evse_params
        };
        let mut entity = InfrastructureEntity::new(
            site(&evse_params),
            Some(facility()),
            catalog(&evse_params),
            &two_month_windows,
            Some("mine site A".into()),
        )
        .unwrap();
        entity.compute_capex().unwrap();

        // 100000 * 2/2 bay pairs + 100/unit * 100 of cable, front-loaded
        assert_eq!(
            entity.registry().get(CONSTRUCTION_COSTS).unwrap().values(),
            &[110_000.0, 0.0]
        );
        // 5 chargers at 10000
        assert_eq!(
            entity.registry().get(EQUIPMENT_CAPEX).unwrap().values(),
            &[50_000.0, 0.0]
        );
        assert_eq!(entity.label(), "infrastructure mine site A");
    }

    #[rstest]
    fn test_scheduled_construction(
        evse_params: EvseParams,
        two_month_windows: AnalysisWindows,
    ) {
        let mut site = site(&evse_params);
        site.evse_stock.clear();
        site.construction_schedule = Some(Schedule::from_pairs(&[
            (date("2022-01-01"), 0.4),
            (date("2022-02-01"), 0.6),
        ]));

        let mut entity = InfrastructureEntity::new(
            site,
            Some(facility()),
            catalog(&evse_params),
            &two_month_windows,
            None,
        )
        .unwrap();
        entity.compute_capex().unwrap();

        assert_eq!(
            entity.registry().get(CONSTRUCTION_COSTS).unwrap().values(),
            &[44_000.0, 66_000.0]
        );
        assert!(entity.registry().get(EQUIPMENT_CAPEX).is_none());
    }

    #[rstest]
    fn test_baas_costs_over_subscription_window(
        evse_params: EvseParams,
        two_month_windows: AnalysisWindows,
    ) {
        let mut site = site(&evse_params);
        site.baas = Some(BaasSubscription {
            frequency: PaymentFrequency::Monthly,
            window: DateRange {
                start: date("2022-02-01"),
                end: date("2022-02-01"),
            },
        });

        let mut entity = InfrastructureEntity::new(
            site,
            None,
            catalog(&evse_params),
            &two_month_windows,
            None,
        )
        .unwrap();
        entity.compute_opex().unwrap();

        // 5 chargers at 10000/month, only within the subscription window
        assert_eq!(
            entity.registry().get(BAAS_COSTS).unwrap().values(),
            &[0.0, 50_000.0]
        );
    }

    #[rstest]
    fn test_annual_baas_produces_no_costs(
        evse_params: EvseParams,
        two_month_windows: AnalysisWindows,
    ) {
        let mut site = site(&evse_params);
        site.baas = Some(BaasSubscription {
            frequency: PaymentFrequency::Annual,
            window: DateRange {
                start: date("2022-01-01"),
                end: date("2022-02-01"),
            },
        });

        let mut entity = InfrastructureEntity::new(
            site,
            None,
            catalog(&evse_params),
            &two_month_windows,
            None,
        )
        .unwrap();
        entity.compute_opex().unwrap();

        assert!(entity.registry().get(BAAS_COSTS).is_none());
    }

    #[rstest]
    fn test_unknown_charger_model(evse_params: EvseParams, two_month_windows: AnalysisWindows) {
        let mut site = site(&evse_params);
        site.evse_stock = indexmap! {"missing model".into() => 1.0};

        assert_error!(
            InfrastructureEntity::new(
                site,
                None,
                catalog(&evse_params),
                &two_month_windows,
                None
            ),
            "Unknown ID missing model found"
        );
    }

    #[rstest]
    fn test_missing_unit_price(evse_params: EvseParams, two_month_windows: AnalysisWindows) {
        // The fixture charger is leased (BaaS) and has no purchase price
        let mut entity = InfrastructureEntity::new(
            site(&evse_params),
            None,
            catalog(&evse_params),
            &two_month_windows,
            None,
        )
        .unwrap();
        assert_error!(
            entity.compute_capex(),
            "EVSE model single charger has no unit price configured"
        );
    }
}
