//! Amortization block (rows 50..79)
//!
//! Each row compounds the year's draw plus the previous running total at the
//! annual-equivalent rate. Rows must be evaluated in ascending order: row *n*
//! reads row *n-1*'s cumulative interest and running total.

use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::cells::{CellAddress, CellReader, CellValue, Sheet};
use crate::rounding::round_accrual;

use super::layout::{
    ANNUAL_RATE, CALCULATION_AGE, FIRST_SCHEDULE_ROW, LAST_SCHEDULE_ROW, MORTGAGE_FOR_CALCULATION,
    ROUNDING_DIGITS, TODAY, WOZ_VALUE,
};

/// Denominators closer to zero than this are treated as zero
pub const DIVISION_EPSILON: f64 = 1e-12;

/// Base substituted when the rate is so close to 1 that `r / (1 - r)` blows up
pub const DEGENERATE_RATE_BASE: f64 = 1e9;

/// Columns D..N of the amortization block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleColumn {
    Year,
    Age,
    ReferenceValue,
    Mortgage,
    Draw,
    Rate,
    Interest,
    CumulativeInterest,
    RunningTotal,
    Total,
    LoanToValue,
}

impl ScheduleColumn {
    /// Formula columns in evaluation order within a row (the draw column is literal)
    pub const DERIVED: [ScheduleColumn; 10] = [
        ScheduleColumn::Year,
        ScheduleColumn::Age,
        ScheduleColumn::ReferenceValue,
        ScheduleColumn::Mortgage,
        ScheduleColumn::Rate,
        ScheduleColumn::Interest,
        ScheduleColumn::CumulativeInterest,
        ScheduleColumn::RunningTotal,
        ScheduleColumn::Total,
        ScheduleColumn::LoanToValue,
    ];

    pub fn letter(&self) -> char {
        match self {
            ScheduleColumn::Year => 'D',
            ScheduleColumn::Age => 'E',
            ScheduleColumn::ReferenceValue => 'F',
            ScheduleColumn::Mortgage => 'G',
            ScheduleColumn::Draw => 'H',
            ScheduleColumn::Rate => 'I',
            ScheduleColumn::Interest => 'J',
            ScheduleColumn::CumulativeInterest => 'K',
            ScheduleColumn::RunningTotal => 'L',
            ScheduleColumn::Total => 'M',
            ScheduleColumn::LoanToValue => 'N',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let column = match letter {
            'D' => ScheduleColumn::Year,
            'E' => ScheduleColumn::Age,
            'F' => ScheduleColumn::ReferenceValue,
            'G' => ScheduleColumn::Mortgage,
            'H' => ScheduleColumn::Draw,
            'I' => ScheduleColumn::Rate,
            'J' => ScheduleColumn::Interest,
            'K' => ScheduleColumn::CumulativeInterest,
            'L' => ScheduleColumn::RunningTotal,
            'M' => ScheduleColumn::Total,
            'N' => ScheduleColumn::LoanToValue,
            _ => return None,
        };
        Some(column)
    }

    pub fn cell(&self, row: u32) -> CellAddress {
        CellAddress::primary(self.letter(), row)
    }

    /// Formula column and row of an address inside the block
    pub fn locate(address: &CellAddress) -> Option<(Self, u32)> {
        let row = address.cell.row();
        if address.sheet != Sheet::Primary || !(FIRST_SCHEDULE_ROW..=LAST_SCHEDULE_ROW).contains(&row) {
            return None;
        }
        let letters = address.cell.column_letters();
        let mut chars = letters.chars();
        let column = match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c)?,
            _ => return None,
        };
        if column == ScheduleColumn::Draw {
            return None;
        }
        Some((column, row))
    }
}

/// Annual compounding factor `((1 + r/(1-r))^(1/12))^12`
pub fn annual_growth_factor(rate: f64) -> f64 {
    let base = if (1.0 - rate).abs() < DIVISION_EPSILON {
        DEGENERATE_RATE_BASE
    } else {
        1.0 + rate / (1.0 - rate)
    };
    let monthly = base.powf(1.0 / 12.0);
    monthly.powf(12.0)
}

/// Rounded interest accrued on `principal` over one year
pub fn annual_interest(principal: f64, rate: f64, digits: i32) -> f64 {
    round_accrual(principal * annual_growth_factor(rate) - principal, digits)
}

fn loan_to_value(total: f64, reference_value: f64) -> f64 {
    if reference_value.abs() < DIVISION_EPSILON {
        0.0
    } else {
        total / reference_value
    }
}

/// Values read once per pass from their single source cells
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleInputs {
    /// Calendar year of today's date (row 50 sequence year)
    pub start_year: f64,
    /// Calculation age (row 50 age)
    pub start_age: f64,
    /// WOZ value
    pub reference_value: f64,
    /// Mortgage for calculation
    pub mortgage: f64,
    /// Annual interest rate
    pub rate: f64,
    /// Decimals kept on annual interest
    pub digits: i32,
}

impl ScheduleInputs {
    pub fn read<R: CellReader + ?Sized>(cells: &R) -> Self {
        Self {
            start_year: calendar::year_of(cells.value(&TODAY).as_ref()) as f64,
            start_age: cells.number(&CALCULATION_AGE),
            reference_value: cells.number(&WOZ_VALUE),
            mortgage: cells.number(&MORTGAGE_FOR_CALCULATION),
            rate: cells.number(&ANNUAL_RATE),
            digits: cells.number(&ROUNDING_DIGITS) as i32,
        }
    }
}

/// One year of the amortization block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub row: u32,
    pub year: f64,
    pub age: f64,
    pub reference_value: f64,
    pub mortgage: f64,
    pub draw: f64,
    pub rate: f64,
    pub interest: f64,
    pub cumulative_interest: f64,
    pub running_total: f64,
    pub total: f64,
    pub loan_to_value: f64,
}

impl AmortizationRow {
    pub fn get(&self, column: ScheduleColumn) -> f64 {
        match column {
            ScheduleColumn::Year => self.year,
            ScheduleColumn::Age => self.age,
            ScheduleColumn::ReferenceValue => self.reference_value,
            ScheduleColumn::Mortgage => self.mortgage,
            ScheduleColumn::Draw => self.draw,
            ScheduleColumn::Rate => self.rate,
            ScheduleColumn::Interest => self.interest,
            ScheduleColumn::CumulativeInterest => self.cumulative_interest,
            ScheduleColumn::RunningTotal => self.running_total,
            ScheduleColumn::Total => self.total,
            ScheduleColumn::LoanToValue => self.loan_to_value,
        }
    }

    /// Formula cells of this row with their values
    pub fn derived_cells(&self) -> impl Iterator<Item = (CellAddress, f64)> + '_ {
        ScheduleColumn::DERIVED
            .iter()
            .map(move |c| (c.cell(self.row), self.get(*c)))
    }
}

/// Values carried from one row to the next
#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub row: u32,
    pub year: f64,
    pub age: f64,
    pub cumulative_interest: f64,
    pub running_total: f64,
}

impl ScheduleState {
    /// State "before" row 50: the first advance lands on the seed year and age
    pub fn new(inputs: &ScheduleInputs) -> Self {
        Self {
            row: FIRST_SCHEDULE_ROW - 1,
            year: inputs.start_year - 1.0,
            age: inputs.start_age - 1.0,
            cumulative_interest: 0.0,
            running_total: 0.0,
        }
    }

    /// Compute the next row from its draw and roll the carried values forward
    pub fn advance(&mut self, inputs: &ScheduleInputs, draw: f64) -> AmortizationRow {
        self.row += 1;
        self.year += 1.0;
        self.age += 1.0;

        let interest = annual_interest(draw + self.running_total, inputs.rate, inputs.digits);
        self.cumulative_interest += interest;
        self.running_total += draw + interest;
        let total = self.running_total + inputs.mortgage;

        AmortizationRow {
            row: self.row,
            year: self.year,
            age: self.age,
            reference_value: inputs.reference_value,
            mortgage: inputs.mortgage,
            draw,
            rate: inputs.rate,
            interest,
            cumulative_interest: self.cumulative_interest,
            running_total: self.running_total,
            total,
            loan_to_value: loan_to_value(total, inputs.reference_value),
        }
    }
}

/// Run the block over `draws` (one per row, starting at row 50)
pub fn project(inputs: &ScheduleInputs, draws: &[f64]) -> Vec<AmortizationRow> {
    let mut state = ScheduleState::new(inputs);
    draws.iter().map(|draw| state.advance(inputs, *draw)).collect()
}

/// Resolve a single block cell on demand, reading neighbours through `cells`
pub fn evaluate_cell<R: CellReader + ?Sized>(cells: &R, column: ScheduleColumn, row: u32) -> Option<CellValue> {
    let first = row == FIRST_SCHEDULE_ROW;
    let previous = |c: ScheduleColumn| if first { 0.0 } else { cells.number(&c.cell(row - 1)) };
    let draw = || cells.number(&ScheduleColumn::Draw.cell(row));
    // (draw, interest, previous running total), reading row n-1 once
    let accrual = || {
        let carried = previous(ScheduleColumn::RunningTotal);
        let principal = draw();
        let interest = annual_interest(
            principal + carried,
            cells.number(&ANNUAL_RATE),
            cells.number(&ROUNDING_DIGITS) as i32,
        );
        (principal, interest, carried)
    };

    let value = match column {
        ScheduleColumn::Year if first => calendar::year_of(cells.value(&TODAY).as_ref()) as f64,
        ScheduleColumn::Year => previous(ScheduleColumn::Year) + 1.0,
        ScheduleColumn::Age if first => cells.number(&CALCULATION_AGE),
        ScheduleColumn::Age => previous(ScheduleColumn::Age) + 1.0,
        ScheduleColumn::ReferenceValue => cells.number(&WOZ_VALUE),
        ScheduleColumn::Mortgage => cells.number(&MORTGAGE_FOR_CALCULATION),
        ScheduleColumn::Draw => return None,
        ScheduleColumn::Rate => cells.number(&ANNUAL_RATE),
        ScheduleColumn::Interest => accrual().1,
        ScheduleColumn::CumulativeInterest => accrual().1 + previous(ScheduleColumn::CumulativeInterest),
        ScheduleColumn::RunningTotal => {
            let (principal, interest, carried) = accrual();
            principal + interest + carried
        }
        ScheduleColumn::Total => {
            cells.number(&ScheduleColumn::RunningTotal.cell(row)) + cells.number(&MORTGAGE_FOR_CALCULATION)
        }
        ScheduleColumn::LoanToValue => loan_to_value(
            cells.number(&ScheduleColumn::Total.cell(row)),
            cells.number(&WOZ_VALUE),
        ),
    };

    Some(CellValue::Number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellStore;
    use approx::assert_relative_eq;

    fn inputs() -> ScheduleInputs {
        ScheduleInputs {
            start_year: 2025.0,
            start_age: 73.0,
            reference_value: 220000.0,
            mortgage: 95000.0,
            rate: 0.0659,
            digits: 2,
        }
    }

    fn draws(first: f64, minimum: f64) -> Vec<f64> {
        let mut draws = vec![0.0; 30];
        draws[0] = first;
        for d in draws.iter_mut().take(15).skip(1) {
            *d = minimum;
        }
        draws
    }

    #[test]
    fn test_growth_factor() {
        // 1 + r/(1-r) == 1/(1-r)
        assert_relative_eq!(annual_growth_factor(0.0659), 1.0 / (1.0 - 0.0659), epsilon = 1e-12);
        assert_relative_eq!(annual_growth_factor(0.0), 1.0, epsilon = 1e-15);
        assert_relative_eq!(annual_growth_factor(1.0), DEGENERATE_RATE_BASE, max_relative = 1e-9);
        assert!(annual_growth_factor(1.0).is_finite());
    }

    #[test]
    fn test_first_row_seeds() {
        let rows = project(&inputs(), &draws(542.0371169589271, 2100.0));
        let first = &rows[0];
        assert_eq!(first.row, 50);
        assert_eq!(first.year, 2025.0);
        assert_eq!(first.age, 73.0);
        assert_relative_eq!(first.interest, 38.24, epsilon = 1e-9);
        assert_relative_eq!(first.cumulative_interest, first.interest, epsilon = 1e-12);
        assert_relative_eq!(first.running_total, 542.0371169589271 + 38.24, epsilon = 1e-9);
        assert_relative_eq!(first.total, first.running_total + 95000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_row_recurrence() {
        let rows = project(&inputs(), &draws(35800.0, 2100.0));
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[29].row, 79);
        assert_eq!(rows[29].year, 2054.0);

        for pair in rows.windows(2) {
            let (prev, row) = (&pair[0], &pair[1]);
            assert_relative_eq!(
                row.cumulative_interest,
                row.interest + prev.cumulative_interest,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                row.running_total,
                row.draw + row.interest + prev.running_total,
                epsilon = 1e-9
            );
            assert_eq!(row.age, prev.age + 1.0);
            assert_relative_eq!(row.loan_to_value, row.total / 220000.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_reference_value_guards_ltv() {
        let mut zero = inputs();
        zero.reference_value = 0.0;
        let rows = project(&zero, &draws(1000.0, 100.0));
        assert!(rows.iter().all(|r| r.loan_to_value == 0.0));
    }

    #[test]
    fn test_lazy_cells_match_projection() {
        let mut store = CellStore::new();
        store.set(TODAY, chrono::NaiveDate::from_ymd_opt(2025, 3, 18).unwrap());
        store.set(CALCULATION_AGE, 73.0);
        store.set(WOZ_VALUE, 220000.0);
        store.set(MORTGAGE_FOR_CALCULATION, 95000.0);
        store.set(ANNUAL_RATE, 0.0659);
        store.set(ROUNDING_DIGITS, 2.0);

        let draws = draws(35800.0, 2100.0);
        for (i, draw) in draws.iter().enumerate() {
            store.set(ScheduleColumn::Draw.cell(FIRST_SCHEDULE_ROW + i as u32), *draw);
        }

        // Fill the block row by row through the lazy path
        for row in FIRST_SCHEDULE_ROW..=LAST_SCHEDULE_ROW {
            for column in ScheduleColumn::DERIVED {
                let value = evaluate_cell(&store, column, row).unwrap();
                store.set(column.cell(row), value);
            }
        }

        let projected = project(&ScheduleInputs::read(&store), &draws);
        for row in &projected {
            for (address, expected) in row.derived_cells() {
                assert_relative_eq!(store.number(&address), expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_locate() {
        assert_eq!(
            ScheduleColumn::locate(&CellAddress::primary('M', 64)),
            Some((ScheduleColumn::Total, 64))
        );
        assert_eq!(ScheduleColumn::locate(&CellAddress::primary('H', 50)), None);
        assert_eq!(ScheduleColumn::locate(&CellAddress::primary('M', 80)), None);
        assert_eq!(ScheduleColumn::locate(&CellAddress::parameters('M', 64)), None);
    }
}
