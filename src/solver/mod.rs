//! Goal seek and the product macro built on it

mod goal_seek;
mod macros;

pub use goal_seek::{
    cap_step, cascade_step, GoalSeekModel, GoalSeekOutcome, GoalSeekStrategy, GoalSeeker, SolverPhase,
    CAP_CASCADE_ITERATIONS, SAMPLE_OFFSET, SLOPE_EPSILON,
};
pub use macros::{
    linear_residual_bound, run_lump_sum, run_macro, Advisory, MacroReport, PayoutModel, LUMP_SUM_MACRO,
    PARTNER_BIRTH_YEAR_FLOOR,
};
