//! Discounted cash flow calculations over annual cost series.
use crate::summary::AnnualSummary;
use crate::units::{Dimensionless, Money};
use anyhow::{Result, ensure};
use indexmap::IndexMap;

/// A contiguous series of annual cash flows.
///
/// The value at offset `t` is the cash flow for year `start_year + t`; interior years with
/// no flows hold zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualCashflows {
    start_year: i32,
    values: Vec<f64>,
}

impl AnnualCashflows {
    /// Create a cash flow series starting in `start_year`.
    pub fn new(start_year: i32, values: Vec<f64>) -> Self {
        AnnualCashflows { start_year, values }
    }

    /// Build the cash flows for one column of an annual summary, spanning the column's
    /// first to last year with interior gaps filled with zero. Returns `None` for an
    /// absent or empty column.
    pub fn from_column(summary: &AnnualSummary, column: &str) -> Option<Self> {
        let years = summary.columns().get(column)?;
        let first = *years.keys().next()?;
        let last = *years.keys().next_back()?;
        let values = (first..=last)
            .map(|year| years.get(&year).copied().unwrap_or(0.0))
            .collect();
        Some(AnnualCashflows {
            start_year: first,
            values,
        })
    }

    /// The first year of the series.
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// The annual values, starting at [`Self::start_year`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Re-anchor the series to the earlier `target_start` by prepending zero years.
    ///
    /// Fails if the series already starts before `target_start`; costs incurred before
    /// the valuation date cannot be discounted forward.
    pub fn extend_to(&self, target_start: i32) -> Result<Self> {
        ensure!(
            self.start_year >= target_start,
            "Cashflow series starts in {}, before the target start year {target_start}",
            self.start_year
        );

        let padding = (self.start_year - target_start) as usize;
        let mut values = vec![0.0; padding];
        values.extend_from_slice(&self.values);
        Ok(AnnualCashflows {
            start_year: target_start,
            values,
        })
    }
}

impl std::ops::Add for &AnnualCashflows {
    type Output = AnnualCashflows;

    /// Combine two cashflow series, aligning to the earlier start year and padding the
    /// shorter series' tail with zeros.
    fn add(self, rhs: &AnnualCashflows) -> AnnualCashflows {
        let start_year = self.start_year.min(rhs.start_year);
        let offset_lhs = (self.start_year - start_year) as usize;
        let offset_rhs = (rhs.start_year - start_year) as usize;
        let len = (offset_lhs + self.values.len()).max(offset_rhs + rhs.values.len());

        let mut values = vec![0.0; len];
        for (index, value) in self.values.iter().enumerate() {
            values[offset_lhs + index] += value;
        }
        for (index, value) in rhs.values.iter().enumerate() {
            values[offset_rhs + index] += value;
        }
        AnnualCashflows { start_year, values }
    }
}

/// The net present value of `cashflows` discounted back to `start_year`.
///
/// The flow at `start_year` itself is undiscounted; the flow `t` years later is divided
/// by `(1 + rate)^t`. A zero rate gives the plain sum.
pub fn npv(
    start_year: i32,
    cashflows: &AnnualCashflows,
    discount_rate: Dimensionless,
) -> Result<Money> {
    ensure!(
        discount_rate.is_finite() && discount_rate > Dimensionless(-1.0),
        "Discount rate must be a finite value greater than -1"
    );

    let aligned = cashflows.extend_to(start_year)?;
    let mut total = 0.0;
    for (offset, value) in aligned.values().iter().enumerate() {
        total += value / (Dimensionless(1.0) + discount_rate).powi(offset as i32).0;
    }
    Ok(Money(total))
}

/// The NPV of every column of an annual summary, discounted back to `start_year`.
///
/// Column order is preserved, so totals stay next to the columns they summarise.
pub fn npv_by_category(
    start_year: i32,
    summary: &AnnualSummary,
    discount_rate: Dimensionless,
) -> Result<IndexMap<String, Money>> {
    let mut result = IndexMap::new();
    for column in summary.columns().keys() {
        let Some(cashflows) = AnnualCashflows::from_column(summary, column) else {
            continue;
        };
        let value = npv(start_year, &cashflows, discount_rate)?;
        result.insert(column.clone(), value);
    }
    Ok(result)
}
