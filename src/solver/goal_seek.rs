//! Goal seek over one input cell
//!
//! The solver varies a single draw amount and reads back the running total
//! after a full recompute. Three strategies share the `GoalSeekModel` seam:
//! - `LinearCorrection`: one secant step between the seed and seed + 100
//! - `IterateToTolerance`: secant steps until the residual is small enough
//! - `StepCascade`: fixed-size steps picked from the residual's magnitude

use serde::{Deserialize, Serialize};

use crate::rounding::round_half_up;

/// Distance between the two secant sample points
pub const SAMPLE_OFFSET: f64 = 100.0;

/// Slopes (and sample spacings) smaller than this are treated as flat
pub const SLOPE_EPSILON: f64 = 1e-15;

/// Attempts allowed when lowering the draw under the cumulative cap
pub const CAP_CASCADE_ITERATIONS: u32 = 500;

/// Something a goal seek can drive: one input, one output, a recompute between
pub trait GoalSeekModel {
    fn set_draw(&mut self, draw: f64);

    fn draw(&self) -> f64;

    fn recalculate(&mut self);

    fn target(&self) -> f64;

    fn running_total(&self) -> f64;

    fn residual(&self) -> f64 {
        self.running_total() - self.target()
    }

    /// First jump of the step cascade, if the model can estimate one
    fn initial_estimate(&self) -> Option<f64> {
        None
    }

    /// How far (rounded) the cumulative obligation sits above its cap
    fn cap_excess(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalSeekStrategy {
    #[default]
    LinearCorrection,
    IterateToTolerance { tolerance: f64, max_iterations: u32 },
    StepCascade { max_iterations: u32 },
}

impl GoalSeekStrategy {
    pub const DEFAULT_TOLERANCE: f64 = 0.01;
    pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

    pub fn iterate() -> Self {
        GoalSeekStrategy::IterateToTolerance {
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn cascade() -> Self {
        GoalSeekStrategy::StepCascade {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GoalSeekStrategy::LinearCorrection => "linear",
            GoalSeekStrategy::IterateToTolerance { .. } => "iterate",
            GoalSeekStrategy::StepCascade { .. } => "cascade",
        }
    }
}

/// One recorded step of a solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SolverPhase {
    Seeded { draw: f64 },
    Sampled { draw: f64, residual: f64 },
    Corrected { draw: f64 },
    Stepped { draw: f64, residual: f64 },
    Final { draw: f64, residual: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSeekOutcome {
    pub strategy: GoalSeekStrategy,
    pub draw: f64,
    pub residual: f64,
    /// Correction steps taken (1 for the linear strategy)
    pub iterations: u32,
    pub phases: Vec<SolverPhase>,
}

impl GoalSeekOutcome {
    pub fn within(&self, tolerance: f64) -> bool {
        self.residual.abs() <= tolerance
    }
}

/// Step size of the cascade for a rounded residual magnitude
pub fn cascade_step(distance: f64) -> f64 {
    match distance {
        d if d > 20000.0 => 10000.0,
        d if d > 10000.0 => 5000.0,
        d if d > 1000.0 => 500.0,
        d if d > 100.0 => 50.0,
        d if d > 10.0 => 5.0,
        d if d > 2.0 => 1.0,
        d if d > 1.0 => 0.5,
        d if d > 0.5 => 0.1,
        _ => 0.01,
    }
}

/// Step size used when the draw pushes the cumulative obligation over the cap
pub fn cap_step(excess: f64) -> f64 {
    if excess > 500000.0 {
        50000.0
    } else if excess > 100000.0 {
        99000.0
    } else {
        0.01
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoalSeeker {
    strategy: GoalSeekStrategy,
}

impl GoalSeeker {
    pub fn new(strategy: GoalSeekStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> GoalSeekStrategy {
        self.strategy
    }

    /// Drive `model` from `seed` toward a zero residual
    pub fn solve<M: GoalSeekModel + ?Sized>(&self, model: &mut M, seed: f64) -> GoalSeekOutcome {
        let mut phases = vec![SolverPhase::Seeded { draw: seed }];
        model.set_draw(seed);
        model.recalculate();

        let iterations = match self.strategy {
            GoalSeekStrategy::LinearCorrection => {
                secant_step(model, seed, &mut phases);
                1
            }
            GoalSeekStrategy::IterateToTolerance { tolerance, max_iterations } => {
                let mut draw = seed;
                let mut iterations = 0;
                loop {
                    let residual = secant_step(model, draw, &mut phases);
                    iterations += 1;
                    draw = model.draw();
                    if residual.abs() <= tolerance || iterations >= max_iterations.max(1) {
                        break;
                    }
                }
                iterations
            }
            GoalSeekStrategy::StepCascade { max_iterations } => step_cascade(model, max_iterations, &mut phases),
        };

        let outcome = GoalSeekOutcome {
            strategy: self.strategy,
            draw: model.draw(),
            residual: model.residual(),
            iterations,
            phases,
        };
        log::debug!(
            "Goal seek ({}) finished after {} step(s): draw {:.4}, residual {:.6}",
            self.strategy.name(),
            outcome.iterations,
            outcome.draw,
            outcome.residual
        );
        outcome
    }
}

fn sample<M: GoalSeekModel + ?Sized>(model: &mut M, draw: f64, phases: &mut Vec<SolverPhase>) -> f64 {
    model.set_draw(draw);
    model.recalculate();
    let residual = model.residual();
    phases.push(SolverPhase::Sampled { draw, residual });
    residual
}

/// Sample at `x0` and `x0 + 100`, jump to the secant root and recompute there.
/// A flat slope keeps `x0`. Returns the residual at the new draw.
fn secant_step<M: GoalSeekModel + ?Sized>(model: &mut M, x0: f64, phases: &mut Vec<SolverPhase>) -> f64 {
    let x1 = x0 + SAMPLE_OFFSET;
    let f0 = sample(model, x0, phases);
    let f1 = sample(model, x1, phases);

    let slope = if (x1 - x0).abs() > SLOPE_EPSILON {
        Some((f1 - f0) / (x1 - x0))
    } else {
        None
    };
    let corrected = match slope {
        Some(s) if s.abs() >= SLOPE_EPSILON => x0 - f0 / s,
        _ => {
            log::warn!("Goal seek slope is flat at draw {}; keeping the seed", x0);
            x0
        }
    };
    phases.push(SolverPhase::Corrected { draw: corrected });

    model.set_draw(corrected);
    model.recalculate();
    let residual = model.residual();
    phases.push(SolverPhase::Final { draw: corrected, residual });
    residual
}

fn move_draw<M: GoalSeekModel + ?Sized>(model: &mut M, draw: f64, phases: &mut Vec<SolverPhase>) {
    model.set_draw(draw);
    model.recalculate();
    phases.push(SolverPhase::Stepped {
        draw,
        residual: model.residual(),
    });
}

fn step_cascade<M: GoalSeekModel + ?Sized>(model: &mut M, max_iterations: u32, phases: &mut Vec<SolverPhase>) -> u32 {
    let target = round_half_up(model.target());
    let mut iterations = 0;

    loop {
        let current = round_half_up(model.running_total());
        if current == target || iterations >= max_iterations {
            break;
        }

        let estimate = if iterations == 0 { model.initial_estimate() } else { None };
        let next = match estimate {
            Some(estimate) => estimate,
            None => {
                let diff = current - target;
                let step = cascade_step(diff.abs());
                if diff > 0.0 {
                    model.draw() - step
                } else {
                    model.draw() + step
                }
            }
        };
        move_draw(model, next, phases);
        iterations += 1;
    }

    if model.cap_excess().is_some_and(|excess| excess > 0.0) {
        for _ in 0..CAP_CASCADE_ITERATIONS {
            let excess = match model.cap_excess() {
                Some(excess) => excess,
                None => break,
            };
            if excess.abs() < 1.0 {
                break;
            }
            let next = if excess > 0.0 {
                model.draw() - cap_step(excess)
            } else {
                model.draw() + 0.01
            };
            move_draw(model, next, phases);
            iterations += 1;
        }
    }

    phases.push(SolverPhase::Final {
        draw: model.draw(),
        residual: model.residual(),
    });
    iterations
}
