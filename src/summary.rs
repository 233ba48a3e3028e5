//! Aggregation of per-entity monthly series into annual TCO summary tables.
use crate::entity::CostEntity;
use crate::fleet;
use crate::units::Dimensionless;
use chrono::Datelike;
use indexmap::IndexMap;
use log::warn;
use std::collections::BTreeSet;

/// Column name for aggregated CAPEX subsidies.
pub const CAPEX_SUBSIDIES: &str = "capex subsidies";
/// Column name for total CAPEX before subsidies.
pub const CAPEX_TOTAL: &str = "capex total";
/// Column name for total CAPEX net of subsidies.
pub const CAPEX_TOTAL_LESS_SUB: &str = "capex total (less sub)";
/// Column name for aggregated OPEX subsidies.
pub const OPEX_SUBSIDIES: &str = "opex subsidies";
/// Column name for total BaaS subscription costs across entities.
pub const BAAS_TOTAL: &str = "baas total";
/// Column name for total OPEX before subsidies.
pub const OPEX_TOTAL: &str = "opex total";
/// Column name for total OPEX net of subsidies.
pub const OPEX_TOTAL_LESS_SUB: &str = "opex total (less sub)";

/// How monthly values are combined into a year's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOp {
    /// Sum the months (energy, costs, hours)
    Sum,
    /// Take the largest month (peak power)
    Max,
}

/// A table of annual values: named columns, each mapping year to value.
///
/// Column order follows insertion order; years are kept sorted within each column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualSummary {
    columns: IndexMap<String, std::collections::BTreeMap<i32, f64>>,
}

impl AnnualSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to `column` at `year`, creating both as needed.
    pub fn add_value(&mut self, column: &str, year: i32, value: f64) {
        *self
            .columns
            .entry(column.to_string())
            .or_default()
            .entry(year)
            .or_insert(0.0) += value;
    }

    /// Raise `column` at `year` to `value` if it is larger, creating both as needed.
    pub fn max_value(&mut self, column: &str, year: i32, value: f64) {
        let entry = self
            .columns
            .entry(column.to_string())
            .or_default()
            .entry(year)
            .or_insert(f64::NEG_INFINITY);
        *entry = entry.max(value);
    }

    /// The value of `column` at `year`, if present.
    pub fn value(&self, column: &str, year: i32) -> Option<f64> {
        self.columns.get(column)?.get(&year).copied()
    }

    /// The columns of the table, in insertion order.
    pub fn columns(&self) -> &IndexMap<String, std::collections::BTreeMap<i32, f64>> {
        &self.columns
    }

    /// The union of the years covered by any column.
    pub fn years(&self) -> BTreeSet<i32> {
        self.columns
            .values()
            .flat_map(|years| years.keys().copied())
            .collect()
    }

    /// Append a column named `name` summing all current columns except those in
    /// `excluding`, with absent years counted as zero.
    pub fn add_total_column(&mut self, name: &str, excluding: &[&str]) {
        let mut totals = std::collections::BTreeMap::new();
        for year in self.years() {
            let total: f64 = self
                .columns
                .iter()
                .filter(|(column, _)| !excluding.contains(&column.as_str()))
                .map(|(_, years)| years.get(&year).copied().unwrap_or(0.0))
                .sum();
            totals.insert(year, total);
        }
        self.columns.insert(name.to_string(), totals);
    }
}

/// Aggregate one named series across entities into per-entity annual columns.
///
/// Each entity holding `variable` contributes a column named by its label; a final
/// "`variable` total" column sums them. Entities without the series are skipped with a
/// warning. Returns `None` when no entity holds the series.
pub fn aggregate_annually(
    entities: &[&dyn CostEntity],
    variable: &str,
    divisor: Dimensionless,
    op: AggregationOp,
) -> Option<AnnualSummary> {
    let mut summary = AnnualSummary::new();
    let mut found = false;

    for entity in entities {
        let Some(series) = entity.registry().get(variable) else {
            warn!(
                "Entity {} has no '{variable}' series; skipping it in aggregation",
                entity.label()
            );
            continue;
        };
        found = true;
        let label = entity.label();
        for (date, value) in series.iter() {
            let value = value / divisor.0;
            match op {
                AggregationOp::Sum => summary.add_value(&label, date.year(), value),
                AggregationOp::Max => summary.max_value(&label, date.year(), value),
            }
        }
    }

    if !found {
        return None;
    }
    summary.add_total_column(&format!("{variable} total"), &[]);
    Some(summary)
}

/// The annual TCO summary tables for a set of analysed entities.
#[derive(Debug, Clone, Default)]
pub struct TcoReport {
    /// Annual operating hours per entity
    pub production: Option<AnnualSummary>,
    /// Annual energy consumption per entity
    pub consumption: Option<AnnualSummary>,
    /// Annual GHG emissions per entity
    pub emissions: Option<AnnualSummary>,
    /// Annual capital costs per entity, with contingency and subsidy columns
    pub capex: Option<AnnualSummary>,
    /// Annual operating costs per entity, with BaaS and subsidy columns
    pub opex: Option<AnnualSummary>,
}

/// Build the full annual TCO report from the entities' computed series.
///
/// `contingency` inflates capital costs (subsidies are left untouched); pass zero to
/// report raw CAPEX.
pub fn tco_summary(entities: &[&dyn CostEntity], contingency: Dimensionless) -> TcoReport {
    TcoReport {
        production: aggregate_annually(
            entities,
            fleet::OPERATING_HOURS,
            Dimensionless(1.0),
            AggregationOp::Sum,
        ),
        consumption: aggregate_annually(
            entities,
            fleet::ENERGY_CONSUMPTION,
            Dimensionless(1.0),
            AggregationOp::Sum,
        ),
        emissions: aggregate_annually(
            entities,
            fleet::EMISSIONS,
            Dimensionless(1.0),
            AggregationOp::Sum,
        ),
        capex: capex_summary(entities, contingency),
        opex: opex_summary(entities),
    }
}

/// Annual CAPEX per entity, inflated by `contingency`, with subsidy and total columns.
fn capex_summary(entities: &[&dyn CostEntity], contingency: Dimensionless) -> Option<AnnualSummary> {
    let factor = Dimensionless(1.0) + contingency;
    let mut summary = AnnualSummary::new();
    let mut found = false;

    for entity in entities {
        let capex = entity.registry().capex_variables();
        if capex.is_empty() {
            continue;
        }
        found = true;
        let label = entity.label();
        for (name, series) in capex {
            for (date, value) in series.iter() {
                if name == fleet::CAPEX_SUBSIDIES {
                    summary.add_value(CAPEX_SUBSIDIES, date.year(), value);
                } else {
                    summary.add_value(&label, date.year(), value * factor.0);
                }
            }
        }
    }

    if !found {
        return None;
    }
    summary.add_total_column(CAPEX_TOTAL, &[CAPEX_SUBSIDIES]);
    for year in summary.years() {
        let total = summary.value(CAPEX_TOTAL, year).unwrap_or(0.0);
        let subsidies = summary.value(CAPEX_SUBSIDIES, year).unwrap_or(0.0);
        summary.add_value(CAPEX_TOTAL_LESS_SUB, year, total + subsidies);
    }
    Some(summary)
}

/// Annual OPEX per entity, with BaaS, subsidy and total columns.
fn opex_summary(entities: &[&dyn CostEntity]) -> Option<AnnualSummary> {
    let mut summary = AnnualSummary::new();
    let mut found = false;

    for entity in entities {
        let opex = entity.registry().opex_variables();
        if opex.is_empty() {
            continue;
        }
        found = true;
        let label = entity.label();
        for (name, series) in opex {
            for (date, value) in series.iter() {
                if name == fleet::OPEX_SUBSIDIES {
                    summary.add_value(OPEX_SUBSIDIES, date.year(), value);
                    continue;
                }
                summary.add_value(&label, date.year(), value);
                if name == fleet::BAAS_COSTS {
                    summary.add_value(BAAS_TOTAL, date.year(), value);
                }
            }
        }
    }

    if !found {
        return None;
    }
    summary.add_total_column(OPEX_TOTAL, &[OPEX_SUBSIDIES, BAAS_TOTAL]);
    for year in summary.years() {
        let total = summary.value(OPEX_TOTAL, year).unwrap_or(0.0);
        let subsidies = summary.value(OPEX_SUBSIDIES, year).unwrap_or(0.0);
        summary.add_value(OPEX_TOTAL_LESS_SUB, year, total + subsidies);
    }
    Some(summary)
}
