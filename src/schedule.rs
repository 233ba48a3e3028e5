//! The schedule allocator distributes lump-sum costs onto a monthly timeline.
use crate::timeline::{CostSeries, Timeline};
use crate::units::{Dimensionless, Money};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::rc::Rc;

/// A fraction of a total cost due at a particular month.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScheduleEntry {
    /// The month the payment falls due
    pub date: NaiveDate,
    /// The fraction of the total amount due
    pub fraction: Dimensionless,
}

/// An ordered list of [`ScheduleEntry`]s describing how a lump cost is spread over time.
///
/// Fractions are not required to sum to one; partial or over-allocation is accepted and
/// not validated here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Schedule(Vec<ScheduleEntry>);

impl Schedule {
    /// Create a schedule from a list of entries.
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Schedule(entries)
    }

    /// Create a schedule from (date, fraction) pairs.
    pub fn from_pairs(pairs: &[(NaiveDate, f64)]) -> Self {
        Schedule(
            pairs
                .iter()
                .map(|&(date, fraction)| ScheduleEntry {
                    date,
                    fraction: Dimensionless(fraction),
                })
                .collect(),
        )
    }

    /// Iterate over the schedule's entries.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.0.iter()
    }
}

/// Allocate `total` onto `timeline` according to `schedule`, producing a series named `name`.
///
/// The series is zero-initialised over the timeline and each entry's slot is incremented
/// (not overwritten) by `fraction * total`, so entries sharing a date accumulate. A schedule
/// date falling outside the timeline is an error; it is never silently dropped.
pub fn allocate(
    timeline: &Rc<Timeline>,
    schedule: &Schedule,
    name: &str,
    total: Money,
) -> Result<CostSeries> {
    let mut series = CostSeries::zeros(name, timeline);
    for entry in schedule.iter() {
        series
            .add_at(entry.date, (entry.fraction * total).value())
            .with_context(|| format!("Schedule date falls outside the {name} timeline"))?;
    }

    Ok(series)
}
