//! Literal cell storage

use std::collections::HashMap;

use super::{CellAddress, CellValue};

/// Read access to cell values
///
/// `CellStore` answers with literals only; the workbook answers with literals
/// falling back to formula results.
pub trait CellReader {
    fn value(&self, address: &CellAddress) -> Option<CellValue>;

    /// Numeric view of a cell (absent, text and dates degrade per `CellValue::to_number`)
    fn number(&self, address: &CellAddress) -> f64 {
        self.value(address).map(|v| v.to_number()).unwrap_or(0.0)
    }
}

/// Keyed mapping from cell address to its current literal value
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    values: HashMap<CellAddress, CellValue>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &CellAddress) -> Option<&CellValue> {
        self.values.get(address)
    }

    /// Unconditional literal overwrite
    pub fn set(&mut self, address: CellAddress, value: impl Into<CellValue>) {
        self.values.insert(address, value.into());
    }

    /// Remove the literal so the cell falls back to its formula (if any)
    pub fn clear(&mut self, address: &CellAddress) -> Option<CellValue> {
        self.values.remove(address)
    }

    pub fn contains(&self, address: &CellAddress) -> bool {
        self.values.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellAddress, &CellValue)> {
        self.values.iter()
    }
}

impl CellReader for CellStore {
    fn value(&self, address: &CellAddress) -> Option<CellValue> {
        self.values.get(address).cloned()
    }
}

impl Extend<(CellAddress, CellValue)> for CellStore {
    fn extend<T: IntoIterator<Item = (CellAddress, CellValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}
