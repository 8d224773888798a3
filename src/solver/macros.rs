//! Product macro: back-solve the first-year lump sum
//!
//! The macro normalises the partner and mortgage flags from the raw inputs,
//! fixes years 2..15 at the minimum annual payment and goal-seeks the
//! first-year draw (H50) so the horizon total (`rngTotal`, M64) meets the
//! capped maximum LTV value.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::cells::CellReader;
use crate::config::CalculationConfig;
use crate::rounding::round_half_up;
use crate::workbook::layout::*;
use crate::workbook::schedule::annual_growth_factor;
use crate::workbook::{ScheduleColumn, Workbook};

use super::goal_seek::{GoalSeekModel, GoalSeekOutcome, GoalSeekStrategy, GoalSeeker, SAMPLE_OFFSET};

/// Name of the 15-year lump-sum macro
pub const LUMP_SUM_MACRO: &str = "lump15yrls";

/// Birth years up to this one do not count as a partner
pub const PARTNER_BIRTH_YEAR_FLOOR: i32 = 1924;

/// Checks logged after the solve; none of them changes the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Advisory {
    CumulativeMortgageAboveCap { cumulative: f64, cap: f64 },
    TotalDrawsBelowMinimum { total: f64, minimum: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroReport {
    pub name: String,
    /// Rounded capped max-LTV value the horizon total is driven to
    pub target: f64,
    pub minimum_payment: f64,
    /// First-year base payout the solve started from
    pub seed: f64,
    pub outcome: GoalSeekOutcome,
    pub advisories: Vec<Advisory>,
}

/// The workbook seen by the goal seek: H50 in, M64 out
pub struct PayoutModel<'a> {
    workbook: &'a mut Workbook,
    target: f64,
    minimum_payment: f64,
}

impl<'a> PayoutModel<'a> {
    pub fn new(workbook: &'a mut Workbook, target: f64, minimum_payment: f64) -> Self {
        Self { workbook, target, minimum_payment }
    }
}

impl GoalSeekModel for PayoutModel<'_> {
    fn set_draw(&mut self, draw: f64) {
        self.workbook.set(FIRST_YEAR_DRAW, draw);
    }

    fn draw(&self) -> f64 {
        self.workbook.number(&FIRST_YEAR_DRAW)
    }

    fn recalculate(&mut self) {
        self.workbook.recalculate();
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn running_total(&self) -> f64 {
        self.workbook.number(&RUNNING_TOTAL_AT_HORIZON)
    }

    /// Target less the fixed later draws and the interest accrued so far
    fn initial_estimate(&self) -> Option<f64> {
        let interest: f64 = (FIRST_SCHEDULE_ROW..=LAST_PAYOUT_ROW)
            .map(|row| self.workbook.number(&ScheduleColumn::Interest.cell(row)))
            .sum();
        Some(self.target - self.minimum_payment * (PAYOUT_YEARS - 1) as f64 - interest)
    }

    fn cap_excess(&self) -> Option<f64> {
        let cumulative = round_half_up(self.workbook.number(&CUMULATIVE_MORTGAGE_AT_HORIZON));
        Some(cumulative - self.workbook.number(&PAYOUT_CAP))
    }
}

/// Run a macro by name; unknown names are skipped
pub fn run_macro(name: &str, workbook: &mut Workbook, config: &CalculationConfig) -> Option<MacroReport> {
    match name {
        LUMP_SUM_MACRO => Some(run_lump_sum(workbook, config.strategy)),
        other => {
            log::warn!("Ignoring unknown macro {:?}", other);
            None
        }
    }
}

/// Set the partner and mortgage flags from the raw inputs
fn normalise_flags(workbook: &mut Workbook) {
    let partner = workbook
        .get(&BIRTHDATE_2)
        .and_then(|v| v.as_date())
        .is_some_and(|d| d.year() > PARTNER_BIRTH_YEAR_FLOOR);
    workbook.set(HAS_PARTNER, if partner { "Ja" } else { "Nee" });

    let mortgage = workbook.number(&MORTGAGE_BALANCE) > 0.0;
    workbook.set(HAS_MORTGAGE, if mortgage { "Ja" } else { "Nee" });
}

fn advisories(workbook: &Workbook) -> Vec<Advisory> {
    let mut found = Vec::new();
    let cap = workbook.number(&PAYOUT_CAP);
    let cumulative = round_half_up(workbook.number(&CUMULATIVE_MORTGAGE_AT_HORIZON));
    if cumulative > cap {
        found.push(Advisory::CumulativeMortgageAboveCap { cumulative, cap });
    }

    let total: f64 = payout_draws().map(|addr| workbook.number(&addr)).sum();
    let minimum = workbook.number(&MINIMUM_TOTAL_PAYOUT);
    if total < minimum {
        found.push(Advisory::TotalDrawsBelowMinimum { total, minimum });
    }
    found
}

/// Worst-case |residual| left by one secant correction from `seed` to `draw`
///
/// Every payout row rounds its interest to `E6` decimals, off by at most half
/// a unit, and each later row compounds that error by the growth factor `g`.
/// The horizon total therefore strays up to
/// `E = 0.5 * 10^-digits * (1 + g + ... + g^(years-1))` from the exact affine
/// map. Both samples carry that error, so the slope is off by up to
/// `2E / SAMPLE_OFFSET`; extrapolating it over `|seed - draw|` and adding the
/// corrected point's own error gives the bound (to first order in the slope
/// error).
pub fn linear_residual_bound(workbook: &Workbook, seed: f64, draw: f64) -> f64 {
    let digits = workbook.number(&ROUNDING_DIGITS) as i32;
    let growth = annual_growth_factor(workbook.number(&ANNUAL_RATE));
    let compounding: f64 = (0..PAYOUT_YEARS).map(|k| growth.powi(k as i32)).sum();
    let drift = 0.5 * 10f64.powi(-digits) * compounding;
    2.0 * drift + (seed - draw).abs() * 2.0 * drift / SAMPLE_OFFSET
}

/// The lump-sum pipeline
pub fn run_lump_sum(workbook: &mut Workbook, strategy: GoalSeekStrategy) -> MacroReport {
    workbook.recalculate();
    normalise_flags(workbook);

    let woz = workbook.number(&WOZ_VALUE);
    for row in FIRST_SCHEDULE_ROW..=LAST_SCHEDULE_ROW {
        workbook.set(ScheduleColumn::ReferenceValue.cell(row), woz);
    }
    workbook.recalculate();

    let target = round_half_up(workbook.number(&CAPPED_MAX_LTV_VALUE));
    let minimum_payment = workbook.number(&MINIMUM_ANNUAL_PAYMENT);
    for row in (FIRST_SCHEDULE_ROW + 1)..=LAST_PAYOUT_ROW {
        workbook.set(ScheduleColumn::Draw.cell(row), minimum_payment);
    }

    let seed = workbook.number(&FIRST_YEAR_BASE_PAYOUT);
    log::info!(
        "Running {}: target {}, minimum payment {}, seed {}",
        LUMP_SUM_MACRO,
        target,
        minimum_payment,
        seed
    );

    let outcome = {
        let mut model = PayoutModel::new(workbook, target, minimum_payment);
        GoalSeeker::new(strategy).solve(&mut model, seed)
    };
    if matches!(strategy, GoalSeekStrategy::LinearCorrection) {
        log::debug!(
            "{}: residual {:.4} against a rounding bound of {:.4}",
            LUMP_SUM_MACRO,
            outcome.residual,
            linear_residual_bound(workbook, seed, outcome.draw)
        );
    }

    let advisories = advisories(workbook);
    for advisory in &advisories {
        log::warn!("{}: {:?}", LUMP_SUM_MACRO, advisory);
    }

    MacroReport {
        name: LUMP_SUM_MACRO.to_string(),
        target,
        minimum_payment,
        seed,
        outcome,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellValue;
    use crate::dataset::StaticDataset;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    /// Applicant born 1952-02-01, WOZ 220000 with a 95000 mortgage
    fn mortgaged_home() -> Workbook {
        let mut wb = Workbook::new(StaticDataset::embedded().unwrap()).unwrap();
        wb.set(TODAY, date(2025, 3, 18));
        wb.set(BIRTHDATE_1, date(1952, 2, 1));
        wb.set(HAS_PARTNER, "Nee");
        wb.set(HAS_MORTGAGE, "Ja");
        wb.set(MORTGAGE_BALANCE, 95000.0);
        wb.set(MARKET_VALUE, 550000.0);
        wb.set(WOZ_VALUE, 220000.0);
        wb
    }

    /// Applicant born 1950-01-15, WOZ 400000, no mortgage
    fn free_home() -> Workbook {
        let mut wb = Workbook::new(StaticDataset::embedded().unwrap()).unwrap();
        wb.set(TODAY, date(2025, 3, 18));
        wb.set(BIRTHDATE_1, date(1950, 1, 15));
        wb.set(HAS_PARTNER, "Nee");
        wb.set(HAS_MORTGAGE, "Nee");
        wb.set(MORTGAGE_BALANCE, 0.0);
        wb.set(WOZ_VALUE, 400000.0);
        wb
    }

    #[test]
    fn test_mortgaged_home_does_not_qualify() {
        let mut wb = mortgaged_home();
        let report = run_lump_sum(&mut wb, GoalSeekStrategy::LinearCorrection);

        assert_eq!(wb.number(&CALCULATION_AGE), 73.0);
        assert_relative_eq!(wb.number(&MAX_LTV_FRACTION), 0.67, epsilon = 1e-12);
        assert_eq!(report.target, 147400.0);
        assert_eq!(report.minimum_payment, 2100.0);
        assert_relative_eq!(report.seed, 35800.0, epsilon = 1e-6);

        let h50 = wb.number(&FIRST_YEAR_DRAW);
        assert!((h50 - 542.037).abs() < 1e-2, "H50 = {}", h50);
        let bound = linear_residual_bound(&wb, report.seed, report.outcome.draw);
        assert!(bound < 100.0, "bound {}", bound);
        assert!(report.outcome.residual.abs() <= bound, "residual {} > {}", report.outcome.residual, bound);
        assert_relative_eq!(report.outcome.residual, 1.737, epsilon = 1e-3);
        assert_relative_eq!(wb.number(&ScheduleColumn::Interest.cell(50)), 38.24, epsilon = 1e-9);

        // The first-year draw is below the minimum annual payment
        assert_eq!(wb.get(&FIRST_YEAR_EXCEEDS_MINIMUM), Some(CellValue::text("No")));
        assert_eq!(wb.get(&QUALIFIES), Some(CellValue::text("No")));
        assert_eq!(wb.get(&TOTAL_PAYOUT), Some(CellValue::Number(0.0)));

        // M64 is L64 plus the outstanding mortgage
        assert_relative_eq!(
            wb.number(&RUNNING_TOTAL_AT_HORIZON),
            wb.number(&CUMULATIVE_MORTGAGE_AT_HORIZON) + 95000.0,
            epsilon = 1e-6
        );
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn test_free_home_qualifies() {
        let mut wb = free_home();
        let report = run_lump_sum(&mut wb, GoalSeekStrategy::LinearCorrection);

        assert_eq!(report.target, 272000.0);
        assert_eq!(report.minimum_payment, 4000.0);
        assert_relative_eq!(report.seed, 0.148 * 400000.0 + 5000.0, epsilon = 1e-6);
        let bound = linear_residual_bound(&wb, report.seed, report.outcome.draw);
        assert!(report.outcome.residual.abs() <= bound, "residual {} > {}", report.outcome.residual, bound);

        let h50 = wb.number(&FIRST_YEAR_DRAW);
        assert!(h50 > 4000.0, "H50 = {}", h50);
        assert_eq!(wb.get(&QUALIFIES), Some(CellValue::text("Yes")));
        assert_relative_eq!(wb.number(&TOTAL_PAYOUT), h50 + 14.0 * 4000.0, epsilon = 1e-6);
        assert_eq!(wb.get(&HAS_MORTGAGE), Some(CellValue::text("Nee")));
    }

    #[test]
    fn test_partner_birthdate_sets_flag_and_lowers_age() {
        let mut wb = mortgaged_home();
        wb.set(BIRTHDATE_2, date(1955, 6, 1));
        run_lump_sum(&mut wb, GoalSeekStrategy::LinearCorrection);

        assert_eq!(wb.get(&HAS_PARTNER), Some(CellValue::text("Ja")));
        assert_eq!(wb.number(&AGE_APPLICANT_2), 69.0);
        assert_eq!(wb.number(&CALCULATION_AGE), 69.0);
        assert_relative_eq!(wb.number(&MAX_LTV_FRACTION), 0.63, epsilon = 1e-12);
    }

    #[test]
    fn test_old_partner_birthdate_is_ignored() {
        let mut wb = mortgaged_home();
        wb.set(HAS_PARTNER, "Ja");
        wb.set(BIRTHDATE_2, date(1920, 6, 1));
        run_lump_sum(&mut wb, GoalSeekStrategy::LinearCorrection);
        assert_eq!(wb.get(&HAS_PARTNER), Some(CellValue::text("Nee")));
        assert_eq!(wb.number(&CALCULATION_AGE), 73.0);
    }

    #[test]
    fn test_linear_residual_is_affine_in_draw() {
        let mut wb = mortgaged_home();
        let report = run_lump_sum(&mut wb, GoalSeekStrategy::LinearCorrection);
        let target = report.target;

        let mut model = PayoutModel::new(&mut wb, target, report.minimum_payment);
        let mut residual_at = |draw: f64| {
            model.set_draw(draw);
            model.recalculate();
            model.residual()
        };
        let (r0, r1, r2) = (residual_at(10000.0), residual_at(10100.0), residual_at(10200.0));
        // Equal steps give (near) equal residual changes; only interest rounding differs
        assert!(((r1 - r0) - (r2 - r1)).abs() < 0.5, "{} {} {}", r0, r1, r2);
    }

    #[test]
    fn test_iterate_tightens_residual() {
        let mut wb = mortgaged_home();
        let strategy = GoalSeekStrategy::IterateToTolerance { tolerance: 0.5, max_iterations: 10 };
        let report = run_lump_sum(&mut wb, strategy);
        assert!(report.outcome.within(0.5), "residual {}", report.outcome.residual);
        assert!(report.outcome.iterations >= 1 && report.outcome.iterations <= 10);
    }

    #[test]
    fn test_rounding_bound_from_digits_and_horizon() {
        let mut wb = mortgaged_home();
        wb.recalculate();
        // g = 1/(1 - 0.0659); 0.005 * (g^15 - 1)/(g - 1) per side
        let drift = 0.005 * (0..PAYOUT_YEARS).map(|k| 1.070549f64.powi(k as i32)).sum::<f64>();
        assert_relative_eq!(drift, 0.12618, epsilon = 1e-4);
        assert_relative_eq!(linear_residual_bound(&wb, 500.0, 500.0), 2.0 * drift, epsilon = 1e-4);
        assert_relative_eq!(
            linear_residual_bound(&wb, 10500.0, 500.0),
            2.0 * drift + 10000.0 * 2.0 * drift / SAMPLE_OFFSET,
            epsilon = 1e-2
        );

        // One more decimal tightens it tenfold
        wb.set(ROUNDING_DIGITS, 3.0);
        assert_relative_eq!(linear_residual_bound(&wb, 500.0, 500.0), 0.2 * drift, epsilon = 1e-5);
    }

    #[test]
    fn test_iterate_reaches_precision_unit() {
        for mut wb in [mortgaged_home(), free_home()] {
            let strategy = GoalSeekStrategy::iterate();
            let report = run_lump_sum(&mut wb, strategy);
            assert!(report.outcome.within(0.01), "residual {}", report.outcome.residual);
            assert!(report.outcome.iterations <= 5, "{} iterations", report.outcome.iterations);
            assert_relative_eq!(
                wb.number(&RUNNING_TOTAL_AT_HORIZON) - report.target,
                report.outcome.residual,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_cascade_reaches_rounded_target() {
        let mut wb = free_home();
        let report = run_lump_sum(&mut wb, GoalSeekStrategy::cascade());
        let total = round_half_up(wb.number(&RUNNING_TOTAL_AT_HORIZON));
        assert_eq!(total, report.target);
    }

    #[test]
    fn test_unknown_macro_is_skipped() {
        let mut wb = mortgaged_home();
        assert!(run_macro("lump30yrls", &mut wb, &CalculationConfig::default()).is_none());
        assert_eq!(wb.passes(), 0);
        assert!(run_macro(LUMP_SUM_MACRO, &mut wb, &CalculationConfig::default()).is_some());
    }
}
