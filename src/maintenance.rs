//! The maintenance tier engine prices usage-based wear from an interval cost table.
//!
//! Maintenance is modelled as a piecewise-constant hourly rate that changes at each usage
//! milestone, reflecting the replacement cadence of major components.
use crate::units::{Hours, Money, MoneyPerHour};
use crate::utils::is_sorted_and_unique;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;

/// An ordered table of cumulative machine-hour thresholds and per-component costs.
///
/// Each threshold marks the end of a maintenance interval; each component contributes one
/// cost estimate per interval. Thresholds are strictly increasing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MaintenanceTierTableRaw")]
pub struct MaintenanceTierTable {
    machine_hours: Vec<Hours>,
    component_costs: IndexMap<String, Vec<Money>>,
}

/// Raw form of [`MaintenanceTierTable`] as read from input, before validation.
#[derive(Debug, Deserialize)]
struct MaintenanceTierTableRaw {
    machine_hours: Vec<Hours>,
    component_costs: IndexMap<String, Vec<Money>>,
}

impl TryFrom<MaintenanceTierTableRaw> for MaintenanceTierTable {
    type Error = anyhow::Error;

    fn try_from(raw: MaintenanceTierTableRaw) -> Result<Self> {
        MaintenanceTierTable::new(raw.machine_hours, raw.component_costs)
    }
}

impl MaintenanceTierTable {
    /// Create a table from interval thresholds and per-component interval costs.
    pub fn new(
        machine_hours: Vec<Hours>,
        component_costs: IndexMap<String, Vec<Money>>,
    ) -> Result<Self> {
        ensure!(
            !machine_hours.is_empty(),
            "Maintenance table must have at least one machine-hours threshold"
        );
        ensure!(
            is_sorted_and_unique(&machine_hours),
            "Maintenance machine-hours thresholds must be strictly increasing"
        );
        ensure!(
            !component_costs.is_empty(),
            "Maintenance table must have at least one component"
        );
        for (component, costs) in &component_costs {
            ensure!(
                costs.len() == machine_hours.len(),
                "Maintenance component {component} has {} costs for {} intervals",
                costs.len(),
                machine_hours.len()
            );
        }

        Ok(MaintenanceTierTable {
            machine_hours,
            component_costs,
        })
    }

    /// The number of maintenance intervals in the table.
    pub fn num_tiers(&self) -> usize {
        self.machine_hours.len()
    }

    /// The tier index applicable at `cumulative_hours`.
    ///
    /// Uses a rightmost insertion point, so a usage value exactly equal to a threshold falls
    /// into the following interval; usage beyond every threshold clamps to the last tier.
    fn tier_index(&self, cumulative_hours: Hours) -> usize {
        let index = self
            .machine_hours
            .partition_point(|threshold| *threshold <= cumulative_hours);
        index.min(self.machine_hours.len() - 1)
    }

    /// The hourly maintenance rate applicable at `cumulative_hours`.
    ///
    /// The rate is the sum of all component costs for the tier divided by the tier's span in
    /// machine hours.
    pub fn rate_for_tier(&self, cumulative_hours: Hours) -> MoneyPerHour {
        let index = self.tier_index(cumulative_hours);

        let tier_cost: Money = self.component_costs.values().map(|costs| costs[index]).sum();
        let tier_span = if index == 0 {
            self.machine_hours[0]
        } else {
            self.machine_hours[index] - self.machine_hours[index - 1]
        };

        tier_cost / tier_span
    }

    /// The maintenance cost for operating `usage` hours at the tier applicable at
    /// `cumulative_hours`.
    ///
    /// The tier lookup must be evaluated independently per month using that month's
    /// cumulative total and that month's usage delta.
    pub fn cost_for_usage(&self, cumulative_hours: Hours, usage: Hours) -> Money {
        self.rate_for_tier(cumulative_hours) * usage
    }
}
