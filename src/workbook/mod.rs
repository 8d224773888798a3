//! Calculation engine instance for one request
//!
//! A `Workbook` owns a cell store seeded from the static dataset. Reads
//! return the literal when one is set and otherwise evaluate the cell's
//! formula on demand without storing it. `recalculate` is the full pass: it
//! writes every scalar formula back in dependency order, then the
//! amortization block row by row.

pub mod formulas;
pub mod layout;
pub mod lookup;
pub mod named;
pub mod recalc;
pub mod schedule;

use chrono::NaiveDate;

use crate::cells::{CellAddress, CellReader, CellStore, CellValue};
use crate::dataset::StaticDataset;
use crate::error::Result;

pub use formulas::{Formula, FormulaRegistry};
pub use lookup::{exact_lookup, LookupRegion, LOOKUP_TOLERANCE};
pub use named::{resolve_name, NamedRange, NAMED_RANGES};
pub use schedule::{AmortizationRow, ScheduleColumn, ScheduleInputs, ScheduleState};

pub struct Workbook {
    cells: CellStore,
    registry: FormulaRegistry,
    order: Vec<CellAddress>,
    dataset_version: Option<NaiveDate>,
    passes: u32,
}

impl Workbook {
    /// Engine over `dataset` with the standard formula set
    pub fn new(dataset: &StaticDataset) -> Result<Self> {
        Self::with_registry(dataset, FormulaRegistry::standard())
    }

    /// Engine with a custom formula set; fails if the formulas form a cycle
    pub fn with_registry(dataset: &StaticDataset, registry: FormulaRegistry) -> Result<Self> {
        let order = recalc::evaluation_order(&registry)?;
        let mut cells = CellStore::new();
        dataset.populate(&mut cells);

        Ok(Self {
            cells,
            registry,
            order,
            dataset_version: dataset.version(),
            passes: 0,
        })
    }

    /// Resolved value: the literal if set, else the formula result
    pub fn get(&self, address: &CellAddress) -> Option<CellValue> {
        if let Some(value) = self.cells.get(address) {
            return Some(value.clone());
        }
        self.registry
            .get(address)
            .and_then(|formula| formula.evaluate(self, address))
    }

    /// Literal only, no formula fallback
    pub fn literal(&self, address: &CellAddress) -> Option<&CellValue> {
        self.cells.get(address)
    }

    pub fn set(&mut self, address: CellAddress, value: impl Into<CellValue>) {
        self.cells.set(address, value);
    }

    pub fn clear(&mut self, address: &CellAddress) -> Option<CellValue> {
        self.cells.clear(address)
    }

    /// Write through a named range; `None` when the name is unknown
    pub fn set_named(&mut self, name: &str, value: impl Into<CellValue>) -> Option<CellAddress> {
        let address = resolve_name(name)?;
        self.cells.set(address, value);
        Some(address)
    }

    pub fn get_named(&self, name: &str) -> Option<CellValue> {
        resolve_name(name).and_then(|address| self.get(&address))
    }

    /// Full recompute pass
    pub fn recalculate(&mut self) {
        for i in 0..self.order.len() {
            let address = self.order[i];
            let value = self
                .registry
                .get(&address)
                .and_then(|formula| formula.evaluate(self, &address));
            match value {
                Some(value) => self.cells.set(address, value),
                None => {
                    self.cells.clear(&address);
                }
            }
        }

        let rows = self.schedule();
        for row in &rows {
            for (address, value) in row.derived_cells() {
                self.cells.set(address, value);
            }
        }

        self.passes += 1;
        log::debug!(
            "Recalculation pass {}: {} formula cells, {} schedule rows",
            self.passes,
            self.order.len(),
            rows.len()
        );
    }

    /// Amortization block computed from the current inputs and draws
    pub fn schedule(&self) -> Vec<AmortizationRow> {
        let inputs = ScheduleInputs::read(self);
        let draws: Vec<f64> = (layout::FIRST_SCHEDULE_ROW..=layout::LAST_SCHEDULE_ROW)
            .map(|row| self.number(&ScheduleColumn::Draw.cell(row)))
            .collect();
        schedule::project(&inputs, &draws)
    }

    /// "Date update" stamp of the dataset this workbook was built from
    pub fn dataset_version(&self) -> Option<NaiveDate> {
        self.dataset_version
    }

    /// Number of full recompute passes run so far
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn cells(&self) -> &CellStore {
        &self.cells
    }

    pub fn registry(&self) -> &FormulaRegistry {
        &self.registry
    }
}

impl CellReader for Workbook {
    fn value(&self, address: &CellAddress) -> Option<CellValue> {
        self.get(address)
    }
}
