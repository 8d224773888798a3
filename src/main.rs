//! Lump-sum model CLI
//!
//! Runs one calculation request and prints the response as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use lumpsum_model::config::strategy_from_name;
use lumpsum_model::{CalculationConfig, CalculationRequest, Evaluation, StaticDataset};

#[derive(Parser)]
#[command(about = "Calculate the 15-year lump-sum payout for one request.")]
struct Args {
    /// Request JSON file; the built-in example request when omitted.
    #[arg(long, value_name = "PATH")]
    request: Option<PathBuf>,

    /// Directory holding baseline_cells.csv and age_parameters.csv.
    #[arg(long, value_name = "DIR")]
    dataset: Option<PathBuf>,

    /// Goal-seek strategy: linear, iterate or cascade (default: LUMPSUM_SOLVER or linear).
    #[arg(long)]
    strategy: Option<String>,

    /// Residual tolerance for the iterate strategy.
    #[arg(long)]
    tolerance: Option<f64>,

    /// Iteration limit for the iterate and cascade strategies.
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Print the amortization schedule to stderr.
    #[arg(long)]
    schedule: bool,

    /// Write the amortization schedule as CSV.
    #[arg(long, value_name = "PATH")]
    schedule_csv: Option<PathBuf>,

    /// Pretty-print the JSON response.
    #[arg(long)]
    pretty: bool,
}

fn config_from_args(args: &Args) -> Result<CalculationConfig> {
    match &args.strategy {
        None => Ok(CalculationConfig::from_env()),
        Some(name) => match strategy_from_name(name, args.tolerance, args.max_iterations) {
            Some(strategy) => Ok(CalculationConfig::new(strategy)),
            None => bail!("unknown strategy {:?} (expected linear, iterate or cascade)", name),
        },
    }
}

fn print_schedule(evaluation: &Evaluation) {
    eprintln!(
        "{:>4} {:>6} {:>5} {:>12} {:>12} {:>8} {:>10} {:>12} {:>14} {:>14} {:>8}",
        "Row", "Year", "Age", "WOZ", "Draw", "Rate", "Interest", "CumInterest", "RunningTotal", "Total", "LTV"
    );
    eprintln!("{}", "-".repeat(118));
    for row in evaluation.workbook.schedule() {
        eprintln!(
            "{:>4} {:>6} {:>5} {:>12.2} {:>12.2} {:>8.4} {:>10.2} {:>12.2} {:>14.2} {:>14.2} {:>8.4}",
            row.row,
            row.year,
            row.age,
            row.reference_value,
            row.draw,
            row.rate,
            row.interest,
            row.cumulative_interest,
            row.running_total,
            row.total,
            row.loan_to_value,
        );
    }

    for report in &evaluation.reports {
        eprintln!(
            "\n{}: target {:.0}, seed {:.2}, {} -> draw {:.2}, residual {:.4} after {} iteration(s)",
            report.name,
            report.target,
            report.seed,
            report.outcome.strategy.name(),
            report.outcome.draw,
            report.outcome.residual,
            report.outcome.iterations,
        );
    }
}

fn write_schedule_csv(evaluation: &Evaluation, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in evaluation.workbook.schedule() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote schedule to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let request = match &args.request {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            CalculationRequest::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CalculationRequest::example(),
    };

    let config = config_from_args(&args)?;
    log::info!("Using {} goal seek", config.strategy.name());

    let evaluation = match &args.dataset {
        Some(dir) => {
            let dataset = StaticDataset::from_dir(dir).with_context(|| format!("loading dataset from {}", dir.display()))?;
            request.evaluate(&dataset, &config)?
        }
        None => request.evaluate(StaticDataset::embedded()?, &config)?,
    };

    if args.schedule {
        print_schedule(&evaluation);
    }
    if let Some(path) = &args.schedule_csv {
        write_schedule_csv(&evaluation, path)?;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&evaluation.response)?
    } else {
        serde_json::to_string(&evaluation.response)?
    };
    println!("{}", json);
    Ok(())
}
