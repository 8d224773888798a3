//! CSV loaders for the static configuration dataset
//!
//! Two files live in `data/lump15/`:
//! - `baseline_cells.csv`: `sheet,cell,kind,value` literal cells (labels, defaults, parameters)
//! - `age_parameters.csv`: `row,age,max_ltv,initial_payout` age-indexed schedule

use std::io::Read;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::cells::{CellAddress, CellValue};
use crate::error::{EngineError, Result};

use super::{AgeParameter, BaselineCell};

pub const BASELINE_FILE: &str = "baseline_cells.csv";
pub const AGE_PARAMETERS_FILE: &str = "age_parameters.csv";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CellKind {
    Number,
    Text,
    Date,
}

/// Raw CSV row of `baseline_cells.csv`
#[derive(Debug, Deserialize)]
struct CsvRow {
    sheet: String,
    cell: String,
    kind: CellKind,
    value: String,
}

impl CsvRow {
    fn to_baseline_cell(self) -> Result<BaselineCell> {
        let address = CellAddress::parse(&self.sheet, &self.cell)?;
        let invalid = |reason: String| EngineError::InvalidDataset {
            location: address.to_string(),
            reason,
        };

        let value = match self.kind {
            CellKind::Number => {
                let n: f64 = self
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("not a number: {:?}", self.value)))?;
                CellValue::Number(n)
            }
            CellKind::Date => {
                let d = NaiveDate::parse_from_str(self.value.trim(), "%Y-%m-%d")
                    .map_err(|_| invalid(format!("not a date: {:?}", self.value)))?;
                CellValue::Date(d)
            }
            CellKind::Text => CellValue::Text(self.value),
        };

        Ok(BaselineCell { address, value })
    }
}

/// Raw CSV row of `age_parameters.csv`
#[derive(Debug, Deserialize)]
struct AgeCsvRow {
    row: u32,
    age: u32,
    max_ltv: f64,
    initial_payout: Option<f64>,
}

impl AgeCsvRow {
    fn to_age_parameter(self) -> AgeParameter {
        AgeParameter {
            row: self.row,
            age: self.age,
            max_ltv: self.max_ltv,
            initial_payout: self.initial_payout,
        }
    }
}

pub fn load_baseline_cells<R: Read>(reader: R) -> Result<Vec<BaselineCell>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut cells = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        cells.push(row.to_baseline_cell()?);
    }

    Ok(cells)
}

/// Load the age schedule, rejecting tables that are not strictly ordered by age
pub fn load_age_parameters<R: Read>(reader: R) -> Result<Vec<AgeParameter>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut entries: Vec<AgeParameter> = Vec::new();

    for result in reader.deserialize() {
        let row: AgeCsvRow = result?;
        let entry = row.to_age_parameter();

        if let Some(previous) = entries.last() {
            if entry.age <= previous.age {
                return Err(EngineError::AgeTableOrder {
                    previous: previous.age,
                    age: entry.age,
                    row: entry.row,
                });
            }
            if entry.row <= previous.row {
                return Err(EngineError::InvalidDataset {
                    location: format!("{} row {}", AGE_PARAMETERS_FILE, entry.row),
                    reason: format!("sheet row {} does not follow row {}", entry.row, previous.row),
                });
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::Sheet;

    #[test]
    fn test_baseline_rows_convert_by_kind() {
        let csv = "sheet,cell,kind,value\n\
                   15yrlump,F2,date,2024-11-07\n\
                   15yrlump,F16,number,220000\n\
                   param15yrlump,D5,text,Interest\n";
        let cells = load_baseline_cells(csv.as_bytes()).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].value, CellValue::Date(NaiveDate::from_ymd_opt(2024, 11, 7).unwrap()));
        assert_eq!(cells[1].value, CellValue::Number(220000.0));
        assert_eq!(cells[2].address.sheet, Sheet::Parameters);
        assert_eq!(cells[2].value, CellValue::text("Interest"));
    }

    #[test]
    fn test_bad_baseline_value_is_reported() {
        let csv = "sheet,cell,kind,value\n15yrlump,F16,number,lots\n";
        let err = load_baseline_cells(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDataset { .. }), "got {:?}", err);

        let csv = "sheet,cell,kind,value\nSheet9,F16,number,1\n";
        let err = load_baseline_cells(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSheet(_)), "got {:?}", err);
    }

    #[test]
    fn test_age_table_blank_payout_and_ordering() {
        let csv = "row,age,max_ltv,initial_payout\n42,84,0.725,0.168\n43,85,0.725,\n";
        let entries = load_age_parameters(csv.as_bytes()).unwrap();
        assert_eq!(entries[0].initial_payout, Some(0.168));
        assert_eq!(entries[1].initial_payout, None);

        let duplicate = "row,age,max_ltv,initial_payout\n42,84,0.725,0.168\n43,84,0.725,\n";
        let err = load_age_parameters(duplicate.as_bytes()).unwrap_err();
        assert!(
            matches!(err, EngineError::AgeTableOrder { previous: 84, age: 84, row: 43 }),
            "got {:?}",
            err
        );
    }
}
