//! The workforce entity: labour costs for a homogeneous group of workers.
//!
//! Staffing is planned per calendar year; labour is costed monthly at the business's rate
//! for the group's role. Workforce entities carry no capital costs.
use crate::business::BusinessParams;
use crate::entity::{AnalysisWindows, CostEntity, EntityKind};
use crate::id::RoleID;
use crate::registry::VariableRegistry;
use crate::timeline::{CostSeries, Timeline};
use crate::units::Dimensionless;
use anyhow::{Context, Result, bail, ensure};
use chrono::Datelike;
use serde::Deserialize;
use std::rc::Rc;

/// Variable name for monthly labour costs.
pub const LABOUR: &str = "labour";
/// Variable name for monthly headcount.
pub const WORKFORCE_SIZE: &str = "workforce size";

/// Planned headcount for one calendar year.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StaffingLevel {
    /// Calendar year the level applies to
    pub year: i32,
    /// Number of workers employed during that year
    pub size: u32,
}

/// The staffing plan for one role.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "WorkforcePlanRaw")]
pub struct WorkforcePlan {
    role: RoleID,
    personnel: Vec<StaffingLevel>,
}

#[derive(Deserialize)]
struct WorkforcePlanRaw {
    role: RoleID,
    personnel: Vec<StaffingLevel>,
}

impl TryFrom<WorkforcePlanRaw> for WorkforcePlan {
    type Error = anyhow::Error;

    fn try_from(raw: WorkforcePlanRaw) -> Result<Self> {
        WorkforcePlan::new(raw.role, raw.personnel)
    }
}

impl WorkforcePlan {
    /// Create a staffing plan. The levels must be given in year order with no duplicates.
    pub fn new(role: RoleID, personnel: Vec<StaffingLevel>) -> Result<Self> {
        let years = personnel.iter().map(|level| level.year).collect::<Vec<_>>();
        ensure!(
            crate::utils::is_sorted_and_unique(&years),
            "Staffing levels for role {role} must be in year order and unique"
        );

        Ok(WorkforcePlan { role, personnel })
    }

    /// The role the plan staffs.
    pub fn role(&self) -> &RoleID {
        &self.role
    }

    /// The planned headcount for `year`. Years outside the plan have no workers.
    pub fn headcount(&self, year: i32) -> u32 {
        self.personnel
            .iter()
            .find(|level| level.year == year)
            .map_or(0, |level| level.size)
    }
}

/// A homogeneous group of workers with a yearly staffing plan.
#[derive(Debug)]
pub struct WorkforceEntity {
    plan: WorkforcePlan,
    business: BusinessParams,
    location: Option<String>,
    opex_timeline: Option<Rc<Timeline>>,
    registry: VariableRegistry,
}

impl WorkforceEntity {
    /// Create a workforce entity, building its analysis timeline up front.
    ///
    /// Workforce entities carry no capital costs, so any CAPEX window in `windows` is
    /// ignored.
    pub fn new(
        plan: WorkforcePlan,
        business: BusinessParams,
        windows: &AnalysisWindows,
        location: Option<String>,
    ) -> Result<Self> {
        let opex_timeline = windows
            .opex
            .map(|range| range.timeline().map(Rc::new))
            .transpose()?;

        Ok(WorkforceEntity {
            plan,
            business,
            location,
            opex_timeline,
            registry: VariableRegistry::new(),
        })
    }
}

impl CostEntity for WorkforceEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Workforce
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
        false
    }

    /// Monthly labour costs: each month's planned headcount times the role's monthly rate.
    fn compute_opex(&mut self) -> Result<()> {
        let timeline = self
            .opex_timeline
            .clone()
            .context("No OPEX analysis window configured for workforce entity")?;
        let rates = self
            .business
            .labour
            .as_ref()
            .context("No labour rates configured for workforce entity")?;
        let monthly_rate = rates.monthly_rate(&self.plan.role)?;

        let mut labour = CostSeries::zeros(LABOUR, &timeline);
        let mut size = CostSeries::zeros(WORKFORCE_SIZE, &timeline);
        for (index, date) in timeline.dates().iter().enumerate() {
            let headcount = self.plan.headcount(date.year());
            labour.set(
                index,
                (Dimensionless(headcount as f64) * monthly_rate).value(),
            );
            size.set(index, headcount as f64);
        }
        self.registry.add_opex(labour);
        self.registry.add(size);

        Ok(())
    }

    fn compute_capex(&mut self) -> Result<()> {
        bail!("Workforce entities have no capital costs")
    }
}
