//! Formula registry for the payout workbook
//!
//! Every derived cell outside the amortization block is one `Formula`
//! variant. Each variant knows which cells it reads, so the registry can be
//! put in dependency order once at construction.

use std::collections::HashMap;

use crate::calendar;
use crate::cells::{CellAddress, CellReader, CellValue};

use super::layout::*;
use super::lookup::exact_lookup;
use super::schedule::{self, ScheduleColumn};

/// Months between today's date and the calculation date
pub const CALCULATION_DATE_OFFSET_MONTHS: i32 = 2;

const YES: &str = "Yes";
const NO: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `EDATE(F5, 2)`
    DateInTwoMonths,
    /// `ROUNDDOWN((F6 - F8) / 365.25, 0)`, 0 when a date is missing
    ApplicantOneAge,
    /// Empty text without a partner or a date, else the age like applicant 1
    ApplicantTwoAge,
    /// `IF(F9="Nee", F11, IF(F9="Ja", MIN(F11:F12)))`
    CalculationAge,
    /// `IF(F17="Nee", 0, F18)`
    MortgageForCalculation,
    MaxLtvFraction,
    MaxLtvValue,
    /// `MIN(F28, param!E8)`
    CappedMaxLtvValue,
    /// `MAX(1000 + 0.5% * WOZ, 1% * (WOZ - F19))`
    MinimumAnnualPayment,
    InitialPayoutFraction,
    InitialPayout,
    /// Mirrors param E7
    FirstYearAddend,
    /// `F35 + param!E7`
    FirstYearBasePayout,
    /// `IF(F86="Yes", SUM(H50:H64), 0)`
    TotalPayout,
    /// `param!E5 * 100`
    InterestPercentage,
    /// `IF(H50 > F31, "Yes", "No")`
    FirstYearExceedsMinimum,
    /// `IF(SUM(H50:H64) > param!E9, "Yes", "No")`
    TotalExceedsThreshold,
    /// `IF(AND(J85="Yes", J86="Yes"), "Yes", "No")`
    Qualifies,
    /// `= source` (parameter table rows that repeat the row above)
    CarryForward { source: CellAddress },
    /// One formula column of the amortization block
    Schedule(ScheduleColumn),
}

fn yes_no(condition: bool) -> CellValue {
    CellValue::text(if condition { YES } else { NO })
}

fn sum_payout_draws<R: CellReader + ?Sized>(cells: &R) -> f64 {
    payout_draws().map(|addr| cells.number(&addr)).sum()
}

impl Formula {
    /// Cells this formula reads
    pub fn dependencies(&self) -> Vec<CellAddress> {
        match self {
            Formula::DateInTwoMonths => vec![TODAY],
            Formula::ApplicantOneAge => vec![DATE_IN_TWO_MONTHS, BIRTHDATE_1],
            Formula::ApplicantTwoAge => vec![HAS_PARTNER, DATE_IN_TWO_MONTHS, BIRTHDATE_2],
            Formula::CalculationAge => vec![HAS_PARTNER, AGE_APPLICANT_1, AGE_APPLICANT_2],
            Formula::MortgageForCalculation => vec![HAS_MORTGAGE, MORTGAGE_BALANCE],
            Formula::MaxLtvFraction => {
                let mut deps = vec![CALCULATION_AGE];
                deps.extend(MAX_LTV_TABLE.column_cells(1));
                deps.extend(MAX_LTV_TABLE.column_cells(MAX_LTV_COLUMN));
                deps
            }
            Formula::MaxLtvValue => vec![MAX_LTV_FRACTION, WOZ_VALUE],
            Formula::CappedMaxLtvValue => vec![MAX_LTV_VALUE, PAYOUT_CAP],
            Formula::MinimumAnnualPayment => vec![WOZ_VALUE, MORTGAGE_FOR_CALCULATION],
            Formula::InitialPayoutFraction => {
                let mut deps = vec![CALCULATION_AGE];
                deps.extend(INITIAL_PAYOUT_TABLE.column_cells(1));
                deps.extend(INITIAL_PAYOUT_TABLE.column_cells(INITIAL_PAYOUT_COLUMN));
                deps
            }
            Formula::InitialPayout => vec![INITIAL_PAYOUT_FRACTION, WOZ_VALUE],
            Formula::FirstYearAddend => vec![FIXED_ADDEND],
            Formula::FirstYearBasePayout => vec![INITIAL_PAYOUT, FIXED_ADDEND],
            Formula::TotalPayout => {
                let mut deps = vec![QUALIFIES];
                deps.extend(payout_draws());
                deps
            }
            Formula::InterestPercentage => vec![ANNUAL_RATE],
            Formula::FirstYearExceedsMinimum => vec![FIRST_YEAR_DRAW, MINIMUM_ANNUAL_PAYMENT],
            Formula::TotalExceedsThreshold => {
                let mut deps: Vec<CellAddress> = payout_draws().collect();
                deps.push(MINIMUM_TOTAL_PAYOUT);
                deps
            }
            Formula::Qualifies => vec![FIRST_YEAR_EXCEEDS_MINIMUM, TOTAL_EXCEEDS_THRESHOLD],
            Formula::CarryForward { source } => vec![*source],
            Formula::Schedule(_) => Vec::new(),
        }
    }

    /// Evaluate against `cells`; `None` leaves the cell empty
    pub fn evaluate<R: CellReader + ?Sized>(&self, cells: &R, address: &CellAddress) -> Option<CellValue> {
        let n = |addr: &CellAddress| cells.number(addr);

        let value = match self {
            Formula::DateInTwoMonths => {
                return calendar::shift_cell(cells.value(&TODAY).as_ref(), CALCULATION_DATE_OFFSET_MONTHS);
            }
            Formula::ApplicantOneAge => {
                let age = calendar::year_difference_cells(
                    cells.value(&DATE_IN_TWO_MONTHS).as_ref(),
                    cells.value(&BIRTHDATE_1).as_ref(),
                );
                CellValue::Number(age.unwrap_or(0) as f64)
            }
            Formula::ApplicantTwoAge => {
                let no_partner = cells.value(&HAS_PARTNER).is_some_and(|v| v.is_flag("nee"));
                if no_partner {
                    return Some(CellValue::empty());
                }
                match calendar::year_difference_cells(
                    cells.value(&DATE_IN_TWO_MONTHS).as_ref(),
                    cells.value(&BIRTHDATE_2).as_ref(),
                ) {
                    Some(age) => CellValue::Number(age as f64),
                    None => CellValue::empty(),
                }
            }
            Formula::CalculationAge => {
                let partner = cells.value(&HAS_PARTNER)?;
                let age_one = cells.value(&AGE_APPLICANT_1);
                if partner.is_flag("nee") {
                    return age_one;
                }
                if !partner.is_flag("ja") {
                    return None;
                }
                return match cells.value(&AGE_APPLICANT_2) {
                    None => age_one,
                    Some(v) if v.is_empty_text() => age_one,
                    Some(age_two) => {
                        let one = age_one.map(|v| v.to_number()).unwrap_or(0.0);
                        Some(CellValue::Number(one.min(age_two.to_number())))
                    }
                };
            }
            Formula::MortgageForCalculation => {
                let no_mortgage = cells.value(&HAS_MORTGAGE).is_some_and(|v| v.is_flag("nee"));
                CellValue::Number(if no_mortgage { 0.0 } else { n(&MORTGAGE_BALANCE) })
            }
            Formula::MaxLtvFraction => {
                return exact_lookup(cells, n(&CALCULATION_AGE), &MAX_LTV_TABLE, MAX_LTV_COLUMN);
            }
            Formula::MaxLtvValue => CellValue::Number(n(&MAX_LTV_FRACTION) * n(&WOZ_VALUE)),
            Formula::CappedMaxLtvValue => {
                let (value, cap) = (n(&MAX_LTV_VALUE), n(&PAYOUT_CAP));
                CellValue::Number(if value > cap { cap } else { value })
            }
            Formula::MinimumAnnualPayment => {
                let woz = n(&WOZ_VALUE);
                let floor = 1000.0 + 0.005 * woz;
                let share = 0.01 * (woz - n(&MORTGAGE_FOR_CALCULATION));
                CellValue::Number(floor.max(share))
            }
            Formula::InitialPayoutFraction => {
                return exact_lookup(cells, n(&CALCULATION_AGE), &INITIAL_PAYOUT_TABLE, INITIAL_PAYOUT_COLUMN);
            }
            Formula::InitialPayout => CellValue::Number(n(&INITIAL_PAYOUT_FRACTION) * n(&WOZ_VALUE)),
            Formula::FirstYearAddend => CellValue::Number(n(&FIXED_ADDEND)),
            Formula::FirstYearBasePayout => CellValue::Number(n(&INITIAL_PAYOUT) + n(&FIXED_ADDEND)),
            Formula::TotalPayout => {
                let qualifies = cells.value(&QUALIFIES).is_some_and(|v| v == CellValue::text(YES));
                CellValue::Number(if qualifies { sum_payout_draws(cells) } else { 0.0 })
            }
            Formula::InterestPercentage => CellValue::Number(n(&ANNUAL_RATE) * 100.0),
            Formula::FirstYearExceedsMinimum => yes_no(n(&FIRST_YEAR_DRAW) > n(&MINIMUM_ANNUAL_PAYMENT)),
            Formula::TotalExceedsThreshold => yes_no(sum_payout_draws(cells) > n(&MINIMUM_TOTAL_PAYOUT)),
            Formula::Qualifies => {
                let is_yes = |addr: &CellAddress| cells.value(addr).is_some_and(|v| v == CellValue::text(YES));
                yes_no(is_yes(&FIRST_YEAR_EXCEEDS_MINIMUM) && is_yes(&TOTAL_EXCEEDS_THRESHOLD))
            }
            Formula::CarryForward { source } => return cells.value(source),
            Formula::Schedule(column) => return schedule::evaluate_cell(cells, *column, address.cell.row()),
        };

        Some(value)
    }
}

/// Formula cells outside the amortization block, in registration order
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    entries: Vec<(CellAddress, Formula)>,
    index: HashMap<CellAddress, usize>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The workbook's formula set
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let scalar = [
            (DATE_IN_TWO_MONTHS, Formula::DateInTwoMonths),
            (AGE_APPLICANT_1, Formula::ApplicantOneAge),
            (AGE_APPLICANT_2, Formula::ApplicantTwoAge),
            (CALCULATION_AGE, Formula::CalculationAge),
            (MORTGAGE_FOR_CALCULATION, Formula::MortgageForCalculation),
            (MAX_LTV_FRACTION, Formula::MaxLtvFraction),
            (MAX_LTV_VALUE, Formula::MaxLtvValue),
            (CAPPED_MAX_LTV_VALUE, Formula::CappedMaxLtvValue),
            (MINIMUM_ANNUAL_PAYMENT, Formula::MinimumAnnualPayment),
            (INITIAL_PAYOUT_FRACTION, Formula::InitialPayoutFraction),
            (INITIAL_PAYOUT, Formula::InitialPayout),
            (FIRST_YEAR_ADDEND, Formula::FirstYearAddend),
            (FIRST_YEAR_BASE_PAYOUT, Formula::FirstYearBasePayout),
            (TOTAL_PAYOUT, Formula::TotalPayout),
            (INTEREST_PERCENTAGE, Formula::InterestPercentage),
            (FIRST_YEAR_EXCEEDS_MINIMUM, Formula::FirstYearExceedsMinimum),
            (QUALIFIES, Formula::Qualifies),
            (TOTAL_EXCEEDS_THRESHOLD, Formula::TotalExceedsThreshold),
        ];
        for (address, formula) in scalar {
            registry.register(address, formula);
        }

        for row in CARRY_FORWARD_ROWS {
            let source = CellAddress::parameters('F', row - 1);
            registry.register(CellAddress::parameters('F', row), Formula::CarryForward { source });
        }

        registry
    }

    /// Add or replace the formula of `address`
    pub fn register(&mut self, address: CellAddress, formula: Formula) {
        match self.index.get(&address) {
            Some(&i) => self.entries[i].1 = formula,
            None => {
                self.index.insert(address, self.entries.len());
                self.entries.push((address, formula));
            }
        }
    }

    /// Formula of `address`, including the amortization block columns
    pub fn get(&self, address: &CellAddress) -> Option<Formula> {
        if let Some(&i) = self.index.get(address) {
            return Some(self.entries[i].1);
        }
        ScheduleColumn::locate(address).map(|(column, _)| Formula::Schedule(column))
    }

    pub fn entries(&self) -> &[(CellAddress, Formula)] {
        &self.entries
    }

    pub fn position(&self, address: &CellAddress) -> Option<usize> {
        self.index.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
