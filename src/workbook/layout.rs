//! Fixed cell positions of the 15-year lump-sum workbook

use crate::cells::{CellAddress, Sheet};

use super::lookup::LookupRegion;

// Inputs (primary sheet)
pub const TODAY: CellAddress = CellAddress::primary('F', 5);
pub const BIRTHDATE_1: CellAddress = CellAddress::primary('F', 8);
pub const HAS_PARTNER: CellAddress = CellAddress::primary('F', 9);
pub const BIRTHDATE_2: CellAddress = CellAddress::primary('F', 10);
pub const MARKET_VALUE: CellAddress = CellAddress::primary('F', 15);
pub const WOZ_VALUE: CellAddress = CellAddress::primary('F', 16);
pub const HAS_MORTGAGE: CellAddress = CellAddress::primary('F', 17);
pub const MORTGAGE_BALANCE: CellAddress = CellAddress::primary('F', 18);
pub const PROVIDER_CHOICE: CellAddress = CellAddress::primary('F', 20);

// Derived cells (primary sheet)
pub const DATE_IN_TWO_MONTHS: CellAddress = CellAddress::primary('F', 6);
pub const AGE_APPLICANT_1: CellAddress = CellAddress::primary('F', 11);
pub const AGE_APPLICANT_2: CellAddress = CellAddress::primary('F', 12);
pub const CALCULATION_AGE: CellAddress = CellAddress::primary('F', 13);
pub const MORTGAGE_FOR_CALCULATION: CellAddress = CellAddress::primary('F', 19);
pub const MAX_LTV_FRACTION: CellAddress = CellAddress::primary('F', 27);
pub const MAX_LTV_VALUE: CellAddress = CellAddress::primary('F', 28);
pub const CAPPED_MAX_LTV_VALUE: CellAddress = CellAddress::primary('F', 29);
pub const MINIMUM_ANNUAL_PAYMENT: CellAddress = CellAddress::primary('F', 31);
pub const INITIAL_PAYOUT_FRACTION: CellAddress = CellAddress::primary('F', 34);
pub const INITIAL_PAYOUT: CellAddress = CellAddress::primary('F', 35);
pub const FIRST_YEAR_ADDEND: CellAddress = CellAddress::primary('E', 36);
pub const FIRST_YEAR_BASE_PAYOUT: CellAddress = CellAddress::primary('F', 36);
pub const TOTAL_PAYOUT: CellAddress = CellAddress::primary('F', 84);
pub const INTEREST_PERCENTAGE: CellAddress = CellAddress::primary('F', 85);
pub const FIRST_YEAR_EXCEEDS_MINIMUM: CellAddress = CellAddress::primary('J', 85);
pub const TOTAL_EXCEEDS_THRESHOLD: CellAddress = CellAddress::primary('J', 86);
pub const QUALIFIES: CellAddress = CellAddress::primary('F', 86);

// Product parameters (parameter sheet)
pub const ANNUAL_RATE: CellAddress = CellAddress::parameters('E', 5);
pub const ROUNDING_DIGITS: CellAddress = CellAddress::parameters('E', 6);
pub const FIXED_ADDEND: CellAddress = CellAddress::parameters('E', 7);
pub const PAYOUT_CAP: CellAddress = CellAddress::parameters('E', 8);
pub const MINIMUM_TOTAL_PAYOUT: CellAddress = CellAddress::parameters('E', 9);

/// Amortization block rows
pub const FIRST_SCHEDULE_ROW: u32 = 50;
pub const LAST_SCHEDULE_ROW: u32 = 79;
pub const SCHEDULE_ROWS: usize = (LAST_SCHEDULE_ROW - FIRST_SCHEDULE_ROW + 1) as usize;

/// Last row of the 15-year payout horizon
pub const LAST_PAYOUT_ROW: u32 = 64;
pub const PAYOUT_YEARS: u32 = LAST_PAYOUT_ROW - FIRST_SCHEDULE_ROW + 1;

/// First-year draw, the goal-seek input
pub const FIRST_YEAR_DRAW: CellAddress = CellAddress::primary('H', FIRST_SCHEDULE_ROW);

/// `rngTotal`: cumulative total at the end of the payout horizon, the goal-seek output
pub const RUNNING_TOTAL_AT_HORIZON: CellAddress = CellAddress::primary('M', LAST_PAYOUT_ROW);

/// Cumulative mortgage at the end of the payout horizon
pub const CUMULATIVE_MORTGAGE_AT_HORIZON: CellAddress = CellAddress::primary('L', LAST_PAYOUT_ROW);

/// Rows whose initial-payout cell repeats the row above
pub const CARRY_FORWARD_ROWS: std::ops::RangeInclusive<u32> = 43..=68;

/// `VLOOKUP(F13, param!D13:F68, 2, FALSE)`
pub const MAX_LTV_TABLE: LookupRegion = LookupRegion::new(Sheet::Parameters, 'D', 'F', 13, 68);
pub const MAX_LTV_COLUMN: usize = 2;

/// `VLOOKUP(F13, param!D23:F51, 3, FALSE)`
pub const INITIAL_PAYOUT_TABLE: LookupRegion = LookupRegion::new(Sheet::Parameters, 'D', 'F', 23, 51);
pub const INITIAL_PAYOUT_COLUMN: usize = 3;

/// Draw cells `H{first}..=H{last}` of the payout horizon
pub fn payout_draws() -> impl Iterator<Item = CellAddress> {
    (FIRST_SCHEDULE_ROW..=LAST_PAYOUT_ROW).map(|row| CellAddress::primary('H', row))
}
