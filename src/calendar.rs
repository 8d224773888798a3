//! Spreadsheet calendar arithmetic
//!
//! Month shifting clamps the day-of-month to 28 for every result, not only
//! for months that are too short. Day counts divide by 365.25 and floor.
//! Non-date inputs yield `None`.

use chrono::{Datelike, NaiveDate};

use crate::cells::CellValue;

/// Highest day-of-month a shifted date keeps
pub const MONTH_SHIFT_DAY_CLAMP: u32 = 28;

/// Average year length used for whole-year age differences
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Shift `date` by `months` (negative to go back), carrying into the year
/// and clamping the day to 28
pub fn month_shift(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(MONTH_SHIFT_DAY_CLAMP);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Last day of the month reached by `month_shift(date, months)`
pub fn end_of_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let shifted = month_shift(date, months)?;
    let (year, month) = if shifted.month() == 12 {
        (shifted.year() + 1, 1)
    } else {
        (shifted.year(), shifted.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Whole years between two dates: `floor((later - earlier) in days / 365.25)`
pub fn year_difference(later: NaiveDate, earlier: NaiveDate) -> i64 {
    let days = (later - earlier).num_days() as f64;
    (days / DAYS_PER_YEAR).floor() as i64
}

/// Calendar year of a date cell; 0 for anything else
pub fn year_of(value: Option<&CellValue>) -> i32 {
    value.and_then(CellValue::as_date).map(|d| d.year()).unwrap_or(0)
}

/// `month_shift` over a cell value
pub fn shift_cell(value: Option<&CellValue>, months: i32) -> Option<CellValue> {
    value
        .and_then(CellValue::as_date)
        .and_then(|d| month_shift(d, months))
        .map(CellValue::Date)
}

/// `year_difference` over two cell values; `None` unless both are dates
pub fn year_difference_cells(later: Option<&CellValue>, earlier: Option<&CellValue>) -> Option<i64> {
    let later = later.and_then(CellValue::as_date)?;
    let earlier = earlier.and_then(CellValue::as_date)?;
    Some(year_difference(later, earlier))
}
