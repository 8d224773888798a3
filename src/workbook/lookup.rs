//! Exact-match table lookup with a numeric tolerance

use crate::cells::{CellAddress, CellReader, CellRef, CellValue, Sheet};

/// Keys match when they differ by less than this
pub const LOOKUP_TOLERANCE: f64 = 1e-10;

/// Rectangular region of one sheet; the first column holds the keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRegion {
    pub sheet: Sheet,
    pub first_column: u32,
    pub last_column: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl LookupRegion {
    pub const fn new(sheet: Sheet, first_column: char, last_column: char, first_row: u32, last_row: u32) -> Self {
        Self {
            sheet,
            first_column: first_column as u32 - 'A' as u32,
            last_column: last_column as u32 - 'A' as u32,
            first_row,
            last_row,
        }
    }

    pub fn width(&self) -> usize {
        (self.last_column + 1).saturating_sub(self.first_column) as usize
    }

    /// Address of the 1-based `column` within the region on `row`, if in range
    pub fn cell(&self, row: u32, column: usize) -> Option<CellAddress> {
        if column == 0 || column > self.width() {
            return None;
        }
        let index = self.first_column + column as u32 - 1;
        Some(CellAddress::new(self.sheet, CellRef::from_index(index, row)))
    }

    /// Every cell of the 1-based `column`, top to bottom
    pub fn column_cells(&self, column: usize) -> Vec<CellAddress> {
        (self.first_row..=self.last_row)
            .filter_map(|row| self.cell(row, column))
            .collect()
    }
}

/// `VLOOKUP(key, region, return_column, FALSE)`
///
/// Rows are scanned top to bottom; rows whose key cell is absent or not
/// numeric are skipped. The first key within [`LOOKUP_TOLERANCE`] wins and
/// its return cell is answered as a number when it parses as one, otherwise
/// as stored (which may be absent). No match, or a return column outside the
/// region, answers 0.
pub fn exact_lookup<R: CellReader + ?Sized>(
    cells: &R,
    key: f64,
    region: &LookupRegion,
    return_column: usize,
) -> Option<CellValue> {
    if region.cell(region.first_row, return_column).is_none() {
        return Some(CellValue::Number(0.0));
    }

    for row in region.first_row..=region.last_row {
        let key_cell = match region.cell(row, 1) {
            Some(addr) => addr,
            None => continue,
        };
        let candidate = match cells.value(&key_cell).and_then(|v| v.parse_number()) {
            Some(n) => n,
            None => continue,
        };

        if (candidate - key).abs() < LOOKUP_TOLERANCE {
            let found = region.cell(row, return_column).and_then(|addr| cells.value(&addr));
            return found.map(|value| match value.parse_number() {
                Some(n) => CellValue::Number(n),
                None => value,
            });
        }
    }

    Some(CellValue::Number(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellStore;

    fn table() -> (CellStore, LookupRegion) {
        let mut store = CellStore::new();
        let rows = [(13, 64.0, 0.55, "0.1"), (14, 65.0, 0.55, "n/a"), (16, 73.0, 0.67, "0.14")];
        for (row, age, ltv, payout) in rows {
            store.set(CellAddress::parameters('D', row), age);
            store.set(CellAddress::parameters('E', row), ltv);
            store.set(CellAddress::parameters('F', row), payout);
        }
        store.set(CellAddress::parameters('D', 15), "Header");
        (store, LookupRegion::new(Sheet::Parameters, 'D', 'F', 13, 17))
    }

    #[test]
    fn test_match_within_tolerance() {
        let (store, region) = table();
        let hit = exact_lookup(&store, 73.0 + 1e-12, &region, 2);
        assert_eq!(hit, Some(CellValue::Number(0.67)));

        // Text return cells that parse come back as numbers
        assert_eq!(exact_lookup(&store, 73.0, &region, 3), Some(CellValue::Number(0.14)));
        assert_eq!(exact_lookup(&store, 65.0, &region, 3), Some(CellValue::text("n/a")));
    }

    #[test]
    fn test_no_match_returns_zero() {
        let (store, region) = table();
        assert_eq!(exact_lookup(&store, 72.5, &region, 2), Some(CellValue::Number(0.0)));
        assert_eq!(exact_lookup(&store, 73.0 + 1e-9, &region, 2), Some(CellValue::Number(0.0)));
        assert_eq!(exact_lookup(&store, 73.0, &region, 4), Some(CellValue::Number(0.0)));
        assert_eq!(exact_lookup(&store, 73.0, &region, 0), Some(CellValue::Number(0.0)));
    }

    #[test]
    fn test_absent_return_cell() {
        let (mut store, region) = table();
        store.clear(&CellAddress::parameters('F', 16));
        assert_eq!(exact_lookup(&store, 73.0, &region, 3), None);
    }
}
