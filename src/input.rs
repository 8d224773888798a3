//! Input normalizer
//!
//! Maps externally supplied named inputs onto primary-sheet cells. Text is
//! trimmed, then tried as `YYYY-MM-DD`, then as `MM-DD-YYYY`, then as a
//! number with thousands separators removed; anything else is kept as text.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::cells::{parse_leading_number, CellAddress, CellValue, Sheet};
use crate::workbook::{resolve_name, Workbook};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("ISO date pattern is valid"));
static US_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})$").expect("US date pattern is valid"));

/// Raw request inputs: sheet name -> named input -> raw value
pub type InputCells = BTreeMap<String, BTreeMap<String, Value>>;

/// Calendar date from month/day/year, rolling out-of-range parts over
/// (month 13 is January of the next year, day 0 the last day of the previous month)
fn rolled_date(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    let total = year * 12 + month - 1;
    let first = NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)?;
    first.checked_add_signed(Duration::days(i64::from(day) - 1))
}

/// Normalize one raw text value
pub fn normalize_text(raw: &str) -> CellValue {
    let text = raw.trim();

    if ISO_DATE.is_match(text) {
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return CellValue::Date(date);
        }
    }

    if let Some(caps) = US_DATE.captures(text) {
        let part = |i: usize| caps[i].parse::<i32>().ok();
        if let (Some(month), Some(day), Some(year)) = (part(1), part(2), part(3)) {
            if let Some(date) = rolled_date(year, month, day) {
                return CellValue::Date(date);
            }
        }
    }

    let stripped = text.replace(',', "");
    match parse_leading_number(&stripped) {
        Some(n) => CellValue::Number(n),
        None => CellValue::Text(stripped),
    }
}

/// Normalize one raw JSON value
pub fn normalize(raw: &Value) -> CellValue {
    match raw {
        Value::String(s) => normalize_text(s),
        Value::Number(n) => match n.as_f64() {
            Some(f) => CellValue::Number(f),
            None => CellValue::Text(n.to_string()),
        },
        Value::Bool(b) => CellValue::Text(b.to_string()),
        Value::Null => CellValue::empty(),
        other => CellValue::Text(other.to_string()),
    }
}

/// Write every recognised input into `workbook`; returns the cells written
///
/// Unknown sheets and unknown input names are skipped.
pub fn apply_inputs(workbook: &mut Workbook, inputs: &InputCells) -> Vec<CellAddress> {
    let mut written = Vec::new();

    for (sheet_name, values) in inputs {
        if Sheet::from_name(sheet_name) != Some(Sheet::Primary) {
            log::warn!("Skipping inputs for sheet {:?}: it has no named inputs", sheet_name);
            continue;
        }

        for (name, raw) in values {
            let address = match resolve_name(name) {
                Some(address) => address,
                None => {
                    log::warn!("Skipping unknown input {:?}", name);
                    continue;
                }
            };
            let value = normalize(raw);
            log::debug!("Input {} -> {} = {:?}", name, address, value);
            workbook.set(address, value);
            written.push(address);
        }
    }

    written
}
