//! Sheet names and A1-style cell addressing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The two sheets of the payout workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sheet {
    /// Calculation sheet holding inputs, derived cells and the amortization block
    #[serde(rename = "15yrlump")]
    Primary,
    /// Product parameters and the age-indexed LTV / payout table
    #[serde(rename = "param15yrlump")]
    Parameters,
}

impl Sheet {
    pub const PRIMARY_NAME: &'static str = "15yrlump";
    pub const PARAMETERS_NAME: &'static str = "param15yrlump";

    pub fn name(&self) -> &'static str {
        match self {
            Sheet::Primary => Self::PRIMARY_NAME,
            Sheet::Parameters => Self::PARAMETERS_NAME,
        }
    }

    /// Resolve a sheet from its workbook name (surrounding whitespace ignored)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            Self::PRIMARY_NAME => Some(Sheet::Primary),
            Self::PARAMETERS_NAME => Some(Sheet::Parameters),
            _ => None,
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sheet {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sheet::from_name(s).ok_or_else(|| EngineError::UnknownSheet(s.to_string()))
    }
}

/// Widest column reference accepted (`XFD`)
const MAX_COLUMN_LETTERS: usize = 3;

/// Column-letter + row-number reference within one sheet (e.g. `F31`)
///
/// Columns are stored 0-based (`A` = 0), rows 1-based as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    column: u32,
    row: u32,
}

impl CellRef {
    /// Build a reference from a single column letter and a row number
    pub const fn new(column: char, row: u32) -> Self {
        Self {
            column: column as u32 - 'A' as u32,
            row,
        }
    }

    pub const fn from_index(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// Same column, different row
    pub fn with_row(&self, row: u32) -> Self {
        Self { column: self.column, row }
    }

    /// Column letters as displayed (`A`, `Z`, `AA`, ...)
    pub fn column_letters(&self) -> String {
        let mut letters = Vec::new();
        let mut n = self.column + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

impl FromStr for CellRef {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches('$');
        let split = raw
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(|| EngineError::InvalidCellRef(s.to_string()))?;
        let (letters, digits) = raw.split_at(split);
        let digits = digits.trim_start_matches('$');

        if letters.is_empty()
            || letters.len() > MAX_COLUMN_LETTERS
            || digits.is_empty()
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(EngineError::InvalidCellRef(s.to_string()));
        }

        let mut column: u32 = 0;
        for c in letters.chars() {
            column = column * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let row: u32 = digits
            .parse()
            .map_err(|_| EngineError::InvalidCellRef(s.to_string()))?;
        if row == 0 {
            return Err(EngineError::InvalidCellRef(s.to_string()));
        }

        Ok(Self { column: column - 1, row })
    }
}

/// (sheet, cell-reference) key of one value slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub sheet: Sheet,
    pub cell: CellRef,
}

impl CellAddress {
    pub const fn new(sheet: Sheet, cell: CellRef) -> Self {
        Self { sheet, cell }
    }

    pub const fn primary(column: char, row: u32) -> Self {
        Self::new(Sheet::Primary, CellRef::new(column, row))
    }

    pub const fn parameters(column: char, row: u32) -> Self {
        Self::new(Sheet::Parameters, CellRef::new(column, row))
    }

    pub fn with_row(&self, row: u32) -> Self {
        Self::new(self.sheet, self.cell.with_row(row))
    }

    /// Parse a `(sheet name, "F31")` pair
    pub fn parse(sheet: &str, cell: &str) -> Result<Self, EngineError> {
        Ok(Self::new(sheet.parse()?, cell.parse()?))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.cell)
    }
}
