//! Tagged cell values and the numeric coercion used by formula reads

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading numeric prefix, as a spreadsheet's loose number parse accepts it
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("numeric prefix pattern is valid")
});

/// Value held by one cell
///
/// A cell may change tag across writes; nothing checks a new value against
/// the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Numeric view: numbers as-is, text by its leading numeric prefix,
    /// dates and unparseable text as 0
    pub fn to_number(&self) -> f64 {
        self.parse_number().unwrap_or(0.0)
    }

    /// Numeric view that distinguishes "not a number" from 0
    pub fn parse_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_nan() => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_leading_number(s),
            CellValue::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    /// Case-insensitive comparison of a text cell against a flag word ("ja", "nee", "Yes")
    pub fn is_flag(&self, flag: &str) -> bool {
        match self {
            CellValue::Text(s) => s.eq_ignore_ascii_case(flag),
            _ => false,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Text(if value { "Yes" } else { "No" }.to_string())
    }
}

/// Parse the leading numeric prefix of `text` (`"95000abc"` -> 95000)
pub fn parse_leading_number(text: &str) -> Option<f64> {
    NUMERIC_PREFIX
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Coerce an optional cell value to a number; absent cells read as 0
pub fn coerce_number(value: Option<&CellValue>) -> f64 {
    value.map(CellValue::to_number).unwrap_or(0.0)
}
