//! Code for working with monthly timelines and the series built on top of them.
//!
//! A [`Timeline`] is the backbone index for every cost series: an ordered sequence of
//! month-start dates with no gaps or duplicates.
use anyhow::{Result, ensure};
use chrono::{Datelike, Months, NaiveDate};
use serde::Deserialize;
use std::rc::Rc;

/// An inclusive range of month-start dates bounding an analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DateRange {
    /// First month of the window
    pub start: NaiveDate,
    /// Last month of the window
    pub end: NaiveDate,
}

impl DateRange {
    /// Build the monthly [`Timeline`] covering this range.
    pub fn timeline(&self) -> Result<Timeline> {
        Timeline::build(self.start, self.end)
    }
}

/// An ordered sequence of month-start dates, closed interval, step one calendar month.
///
/// Immutable after creation. Invariant: strictly increasing, no gaps, no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    dates: Vec<NaiveDate>,
}

impl Timeline {
    /// Build a timeline of month-start dates between `start` and `end` (both inclusive).
    ///
    /// Both bounds must themselves be month-start dates and `end` must not precede `start`.
    pub fn build(start: NaiveDate, end: NaiveDate) -> Result<Timeline> {
        ensure!(
            start.day() == 1,
            "Timeline start date {start} is not a month start"
        );
        ensure!(
            end.day() == 1,
            "Timeline end date {end} is not a month start"
        );
        ensure!(
            end >= start,
            "Timeline end date {end} is before start date {start}"
        );

        let mut dates = Vec::new();
        let mut current = start;
        while current <= end {
            dates.push(current);
            current = current + Months::new(1);
        }

        Ok(Timeline { dates })
    }

    /// The dates making up the timeline, in order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The number of months in the timeline.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the timeline contains no months (cannot occur for a built timeline).
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The first month of the timeline.
    pub fn start(&self) -> NaiveDate {
        self.dates[0]
    }

    /// The last month of the timeline.
    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// The index of `date` within the timeline, if present.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Whether `date` is one of the timeline's months.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.position(date).is_some()
    }
}

/// A named series of monthly values aligned to a [`Timeline`].
///
/// Values are unit-less scalars in the currency/unit convention of the input; the unit
/// discipline is enforced in the analyzer formulas that produce them.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    name: String,
    timeline: Rc<Timeline>,
    values: Vec<f64>,
}

/// A [`MonthlySeries`] holding a cost category.
pub type CostSeries = MonthlySeries;

impl MonthlySeries {
    /// Create a zero-initialised series over `timeline`.
    pub fn zeros(name: &str, timeline: &Rc<Timeline>) -> Self {
        MonthlySeries {
            name: name.to_string(),
            timeline: Rc::clone(timeline),
            values: vec![0.0; timeline.len()],
        }
    }

    /// Create a series from pre-computed values.
    pub fn from_values(name: &str, timeline: &Rc<Timeline>, values: Vec<f64>) -> Result<Self> {
        ensure!(
            values.len() == timeline.len(),
            "Series {name} has {} values for a timeline of {} months",
            values.len(),
            timeline.len()
        );
        Ok(MonthlySeries {
            name: name.to_string(),
            timeline: Rc::clone(timeline),
            values,
        })
    }

    /// The name identifying the series' cost category.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The timeline the series is aligned to.
    pub fn timeline(&self) -> &Rc<Timeline> {
        &self.timeline
    }

    /// The per-month values, aligned with the timeline's dates.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value at `date`, if the date is in the timeline.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.timeline.position(date).map(|i| self.values[i])
    }

    /// Overwrite the value at month index `index`.
    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    /// Increment the value at `date` by `amount`.
    ///
    /// Fails if `date` falls outside the series' timeline.
    pub fn add_at(&mut self, date: NaiveDate, amount: f64) -> Result<()> {
        let index = self.timeline.position(date);
        ensure!(
            index.is_some(),
            "Date {date} is outside the timeline ({} to {})",
            self.timeline.start(),
            self.timeline.end()
        );
        self.values[index.unwrap()] += amount;
        Ok(())
    }

    /// Iterate over (date, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.timeline
            .dates()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// The sum of all monthly values.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}
