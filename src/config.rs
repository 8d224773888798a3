//! Calculation configuration

use serde::{Deserialize, Serialize};

use crate::solver::GoalSeekStrategy;

pub const SOLVER_ENV: &str = "LUMPSUM_SOLVER";
pub const TOLERANCE_ENV: &str = "LUMPSUM_TOLERANCE";
pub const MAX_ITERATIONS_ENV: &str = "LUMPSUM_MAX_ITERATIONS";

/// Options for one calculation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Goal-seek strategy used by the payout macro
    pub strategy: GoalSeekStrategy,
}

impl CalculationConfig {
    pub fn new(strategy: GoalSeekStrategy) -> Self {
        Self { strategy }
    }

    /// Read `LUMPSUM_SOLVER`, `LUMPSUM_TOLERANCE` and `LUMPSUM_MAX_ITERATIONS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` over any key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let tolerance = lookup(TOLERANCE_ENV).and_then(|raw| match raw.trim().parse::<f64>() {
            Ok(t) if t > 0.0 => Some(t),
            _ => {
                log::warn!("Ignoring {}={:?}: expected a positive number", TOLERANCE_ENV, raw);
                None
            }
        });
        let max_iterations = lookup(MAX_ITERATIONS_ENV).and_then(|raw| match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                log::warn!("Ignoring {}={:?}: expected a positive integer", MAX_ITERATIONS_ENV, raw);
                None
            }
        });

        let strategy = match lookup(SOLVER_ENV) {
            None => GoalSeekStrategy::default(),
            Some(name) => strategy_from_name(&name, tolerance, max_iterations).unwrap_or_else(|| {
                log::warn!("Unknown {}={:?}; using the linear correction", SOLVER_ENV, name);
                GoalSeekStrategy::default()
            }),
        };

        Self { strategy }
    }
}

/// Strategy for a name (`linear`, `iterate`, `cascade`) with optional overrides
pub fn strategy_from_name(name: &str, tolerance: Option<f64>, max_iterations: Option<u32>) -> Option<GoalSeekStrategy> {
    let max_iterations = max_iterations.unwrap_or(GoalSeekStrategy::DEFAULT_MAX_ITERATIONS);
    match name.trim().to_ascii_lowercase().as_str() {
        "linear" | "linear_correction" => Some(GoalSeekStrategy::LinearCorrection),
        "iterate" | "iterate_to_tolerance" => Some(GoalSeekStrategy::IterateToTolerance {
            tolerance: tolerance.unwrap_or(GoalSeekStrategy::DEFAULT_TOLERANCE),
            max_iterations,
        }),
        "cascade" | "step_cascade" => Some(GoalSeekStrategy::StepCascade { max_iterations }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> CalculationConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        CalculationConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_is_linear() {
        assert_eq!(config(&[]).strategy, GoalSeekStrategy::LinearCorrection);
        assert_eq!(CalculationConfig::default().strategy, GoalSeekStrategy::LinearCorrection);
    }

    #[test]
    fn test_env_selects_strategy() {
        let c = config(&[(SOLVER_ENV, "Iterate"), (TOLERANCE_ENV, "0.5"), (MAX_ITERATIONS_ENV, "12")]);
        assert_eq!(
            c.strategy,
            GoalSeekStrategy::IterateToTolerance { tolerance: 0.5, max_iterations: 12 }
        );

        let c = config(&[(SOLVER_ENV, "cascade"), (MAX_ITERATIONS_ENV, "zero")]);
        assert_eq!(c.strategy, GoalSeekStrategy::StepCascade { max_iterations: 200 });
    }

    #[test]
    fn test_unknown_solver_falls_back() {
        assert_eq!(config(&[(SOLVER_ENV, "newton")]).strategy, GoalSeekStrategy::LinearCorrection);
    }
}
