//! The trait shared by all cost-bearing entity kinds.
use crate::registry::VariableRegistry;
use crate::timeline::DateRange;
use anyhow::Result;
use serde::Deserialize;

/// The kind of a cost-bearing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    /// A homogeneous group of vehicles
    Fleet,
    /// Charging/site infrastructure
    Infrastructure,
    /// Digital solutions (IT/OT products)
    Digital,
    /// A homogeneous group of workers
    Workforce,
}

/// The CAPEX and OPEX analysis windows configured for an entity.
///
/// Either window may be absent, in which case the corresponding analysis is skipped by
/// [`CostEntity::execute`] and fails if invoked directly.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnalysisWindows {
    /// Window for CAPEX cost series
    #[serde(default)]
    pub capex: Option<DateRange>,
    /// Window for OPEX cost series
    #[serde(default)]
    pub opex: Option<DateRange>,
}

/// A cost-bearing entity: owns its input parameters, its timelines and a
/// [`VariableRegistry`] populated by its analysis methods.
///
/// Entities are stateless request/response; re-running an analysis recomputes and
/// overwrites the registry entries. Each entity owns its data exclusively, so entities can
/// be analysed independently of one another.
pub trait CostEntity {
    /// The entity's kind.
    fn kind(&self) -> EntityKind;

    /// The entity's geographic location, if assigned.
    fn location(&self) -> Option<&str>;

    /// The entity's computed cost series.
    fn registry(&self) -> &VariableRegistry;

    /// Whether an OPEX analysis window is configured.
    fn has_opex_window(&self) -> bool;

    /// Whether a CAPEX analysis window is configured.
    fn has_capex_window(&self) -> bool;

    /// Compute the entity's operating costs, populating the registry's OPEX subset.
    fn compute_opex(&mut self) -> Result<()>;

    /// Compute the entity's capital costs, populating the registry's CAPEX subset.
    fn compute_capex(&mut self) -> Result<()>;

    /// Run whichever of the OPEX/CAPEX analyses have a configured window.
    fn execute(&mut self) -> Result<()> {
        if self.has_opex_window() {
            self.compute_opex()?;
        }
        if self.has_capex_window() {
            self.compute_capex()?;
        }
        Ok(())
    }

    /// A label identifying the entity in aggregated output (kind plus location).
    fn label(&self) -> String {
        match self.location() {
            Some(location) => format!("{} {}", self.kind(), location),
            None => self.kind().to_string(),
        }
    }
}
