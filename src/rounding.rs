//! Spreadsheet rounding helpers

/// Round `value` to `digits` decimals the way interest accruals are rounded:
/// floor-based half-up, except that an exact half goes to the even neighbour.
///
/// `round_accrual(0.125, 2) == 0.12`, `round_accrual(0.135, 2) == 0.14`.
pub fn round_accrual(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let shifted = value * factor;
    let rounded = (shifted + 0.5).floor();

    if (shifted - rounded).abs() == 0.5 {
        let down = shifted.floor();
        let even = if down % 2.0 == 0.0 { down } else { shifted.ceil() };
        return even / factor;
    }

    rounded / factor
}

/// Whole-number half-up rounding (`2.5 -> 3`, `-2.5 -> -2`)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Truncate toward negative infinity at `digits` decimals
pub fn round_down(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).floor() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accrual_tie_goes_to_even() {
        assert!((round_accrual(0.125, 2) - 0.12).abs() < 1e-12);
        assert!((round_accrual(0.135, 2) - 0.14).abs() < 1e-12);
        assert!((round_accrual(2.5, 0) - 2.0).abs() < 1e-12);
        assert!((round_accrual(3.5, 0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_accrual_non_ties() {
        assert!((round_accrual(38.2412, 2) - 38.24).abs() < 1e-12);
        assert!((round_accrual(38.2462, 2) - 38.25).abs() < 1e-12);
        assert!((round_accrual(-1.237, 2) + 1.24).abs() < 1e-12);
        assert_eq!(round_accrual(0.0, 2), 0.0);
    }

    #[test]
    fn test_half_up_and_down() {
        assert_eq!(round_half_up(147400.4), 147400.0);
        assert_eq!(round_half_up(147400.5), 147401.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert!((round_down(73.99, 0) - 73.0).abs() < 1e-12);
        assert!((round_down(1.239, 2) - 1.23).abs() < 1e-12);
    }
}
