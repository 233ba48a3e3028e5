//! The digital solutions entity: IT/OT products supporting a BEV operation, such as fleet
//! management or battery analytics software.
use crate::entity::{AnalysisWindows, CostEntity, EntityKind};
use crate::registry::VariableRegistry;
use crate::schedule::{Schedule, allocate};
use crate::timeline::{CostSeries, Timeline};
use crate::units::Money;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::rc::Rc;

/// Variable name for software purchase costs.
pub const SOFTWARE_CAPEX: &str = "software capex";
/// Variable name for software subscription costs.
pub const SOFTWARE_OPEX: &str = "software opex";

/// Parameters for one digital solution.
#[derive(Debug, Clone, Deserialize)]
pub struct SolutionParams {
    /// Name of the product
    pub name: String,
    /// One-off purchase price
    #[serde(default)]
    pub unit_price: Option<Money>,
    /// Monthly subscription fee
    #[serde(default)]
    pub subscription_price: Option<Money>,
    /// Dates and fractions at which the purchase price falls due; when absent the full
    /// price falls due in the CAPEX window's first month
    #[serde(default)]
    pub purchase_schedule: Option<Schedule>,
}

/// A set of digital solutions analysed together.
#[derive(Debug)]
pub struct DigitalSolutionsEntity {
    solutions: Vec<SolutionParams>,
    location: Option<String>,
    capex_timeline: Option<Rc<Timeline>>,
    opex_timeline: Option<Rc<Timeline>>,
    registry: VariableRegistry,
}

impl DigitalSolutionsEntity {
    /// Create a digital solutions entity, building its analysis timelines up front.
    pub fn new(
        solutions: Vec<SolutionParams>,
        windows: &AnalysisWindows,
        location: Option<String>,
    ) -> Result<Self> {
        let capex_timeline = windows
            .capex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;
        let opex_timeline = windows
            .opex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;

        Ok(DigitalSolutionsEntity {
            solutions,
            location,
            capex_timeline,
            opex_timeline,
            registry: VariableRegistry::new(),
        })
    }
}

impl CostEntity for DigitalSolutionsEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Digital
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

    /// Monthly subscription costs, summed across the solutions that have one.
    fn compute_opex(&mut self) -> Result<()> {
        let timeline = self
            .opex_timeline
            .clone()
            .context("No OPEX analysis window configured for digital entity")?;

        let monthly: Money = self
            .solutions
            .iter()
            .filter_map(|solution| solution.subscription_price)
            .sum();
        if monthly == Money(0.0) {
            return Ok(());
        }

        let mut series = CostSeries::zeros(SOFTWARE_OPEX, &timeline);
        for index in 0..timeline.len() {
            series.set(index, monthly.value());
        }
        self.registry.add_opex(series);

        Ok(())
    }

    /// Purchase costs allocated onto the CAPEX timeline, summed across the solutions that
    /// have a purchase price.
    fn compute_capex(&mut self) -> Result<()> {
        let timeline = self
            .capex_timeline
            .clone()
            .context("No CAPEX analysis window configured for digital entity")?;

        let mut series = CostSeries::zeros(SOFTWARE_CAPEX, &timeline);
        let mut any = false;
        for solution in &self.solutions {
            let Some(price) = solution.unit_price else {
                continue;
            };
            any = true;
            match &solution.purchase_schedule {
                Some(schedule) => {
                    let allocated = allocate(&timeline, schedule, SOFTWARE_CAPEX, price)?;
                    for (index, value) in allocated.values().iter().enumerate() {
                        series.set(index, series.values()[index] + value);
                    }
                }
                None => series.add_at(timeline.start(), price.value())?,
            }
        }
        if any {
            self.registry.add_capex(series);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{date, two_month_windows};
    use rstest::rstest;

    fn solutions() -> Vec<SolutionParams> {
        vec![
            SolutionParams {
                name: "fleet management".into(),
                unit_price: Some(Money(200_000.0)),
                subscription_price: Some(Money(20_000.0)),
                purchase_schedule: None,
            },
            SolutionParams {
                name: "battery analytics".into(),
                unit_price: None,
                subscription_price: Some(Money(5000.0)),
                purchase_schedule: None,
            },
        ]
    }

    #[rstest]
    fn test_software_costs(two_month_windows: AnalysisWindows) {
        let mut entity =
            DigitalSolutionsEntity::new(solutions(), &two_month_windows, None).unwrap();
        entity.execute().unwrap();

        // The unscheduled purchase falls due in the first month
        assert_eq!(
            entity.registry().get(SOFTWARE_CAPEX).unwrap().values(),
            &[200_000.0, 0.0]
        );
        assert_eq!(
            entity.registry().get(SOFTWARE_OPEX).unwrap().values(),
            &[25_000.0, 25_000.0]
        );
    }

    #[rstest]
    fn test_scheduled_purchase(two_month_windows: AnalysisWindows) {
        let mut solutions = solutions();
        solutions[0].purchase_schedule = Some(Schedule::from_pairs(&[
            (date("2022-01-01"), 0.5),
            (date("2022-02-01"), 0.5),
        ]));

        let mut entity = DigitalSolutionsEntity::new(solutions, &two_month_windows, None).unwrap();
        entity.compute_capex().unwrap();

        assert_eq!(
            entity.registry().get(SOFTWARE_CAPEX).unwrap().values(),
            &[100_000.0, 100_000.0]
        );
    }

    #[rstest]
    fn test_no_priced_solutions_register_nothing(two_month_windows: AnalysisWindows) {
        let solutions = vec![SolutionParams {
            name: "trial product".into(),
            unit_price: None,
            subscription_price: None,
            purchase_schedule: None,
        }];
        let mut entity = DigitalSolutionsEntity::new(solutions, &two_month_windows, None).unwrap();
        entity.execute().unwrap();

        assert!(entity.registry().variables().is_empty());
    }
}
