//! The variable registry holds an entity's computed cost series by name.
use crate::timeline::CostSeries;
use indexmap::IndexMap;
use std::rc::Rc;

/// Per-entity mapping from cost-series name to computed series.
///
/// The registry keeps all named series in `variables` and additionally tracks which of them
/// belong to the CAPEX and OPEX subsets. A series appearing in a subset is shared by
/// reference with `variables`, not copied. Re-registering a name overwrites the previous
/// entry.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: IndexMap<String, Rc<CostSeries>>,
    capex: IndexMap<String, Rc<CostSeries>>,
    opex: IndexMap<String, Rc<CostSeries>>,
}

impl VariableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its name, outside the CAPEX/OPEX subsets.
    pub fn add(&mut self, series: CostSeries) -> Rc<CostSeries> {
        let series = Rc::new(series);
        self.variables
            .insert(series.name().to_string(), Rc::clone(&series));
        series
    }

    /// Register a series as a CAPEX variable (also visible in `variables`).
    pub fn add_capex(&mut self, series: CostSeries) -> Rc<CostSeries> {
        let series = self.add(series);
        self.capex
            .insert(series.name().to_string(), Rc::clone(&series));
        series
    }

    /// Register a series as an OPEX variable (also visible in `variables`).
    pub fn add_opex(&mut self, series: CostSeries) -> Rc<CostSeries> {
        let series = self.add(series);
        self.opex
            .insert(series.name().to_string(), Rc::clone(&series));
        series
    }

    /// Look up a series by name.
    pub fn get(&self, name: &str) -> Option<&Rc<CostSeries>> {
        self.variables.get(name)
    }

    /// All registered series, in insertion order.
    pub fn variables(&self) -> &IndexMap<String, Rc<CostSeries>> {
        &self.variables
    }

    /// The CAPEX subset of the registered series.
    pub fn capex_variables(&self) -> &IndexMap<String, Rc<CostSeries>> {
        &self.capex
    }

    /// The OPEX subset of the registered series.
    pub fn opex_variables(&self) -> &IndexMap<String, Rc<CostSeries>> {
        &self.opex
    }
}
