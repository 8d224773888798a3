//! Lump-sum payout model - calculation engine for the 15-year lump-sum reverse-mortgage sheet
//!
//! This library provides:
//! - A two-sheet cell store seeded from the bundled static dataset
//! - The sheet's formulas, recalculated in dependency order
//! - The 30-year amortization schedule (rows 50..79)
//! - Goal seek of the first-year draw and the `lump15yrls` macro
//! - The JSON request / response contract used by the CLI and the Lambda handler

pub mod calendar;
pub mod cells;
pub mod config;
pub mod dataset;
pub mod error;
pub mod input;
pub mod request;
pub mod rounding;
pub mod solver;
pub mod workbook;

// Re-export commonly used types
pub use cells::{CellAddress, CellRef, CellValue, Sheet};
pub use config::CalculationConfig;
pub use dataset::StaticDataset;
pub use error::{EngineError, Result};
pub use request::{calculate, CalculationRequest, CalculationResponse, Evaluation};
pub use solver::{GoalSeekStrategy, MacroReport};
pub use workbook::{AmortizationRow, Workbook};
