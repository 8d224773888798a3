//! Run a batch of calculation requests from a JSON array
//!
//! Writes the responses as a JSON array (same order as the input) and
//! optionally a one-row-per-request CSV summary of the key outputs.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use lumpsum_model::cells::CellReader;
use lumpsum_model::config::strategy_from_name;
use lumpsum_model::workbook::layout;
use lumpsum_model::{CalculationConfig, CalculationRequest, CalculationResponse, Evaluation, StaticDataset};

#[derive(Parser)]
#[command(about = "Calculate a JSON array of lump-sum requests in parallel.")]
struct Args {
    /// JSON file holding an array of calculation requests.
    requests: PathBuf,

    /// Response file; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Per-request summary CSV.
    #[arg(long, value_name = "PATH")]
    summary_csv: Option<PathBuf>,

    /// Goal-seek strategy: linear, iterate or cascade.
    #[arg(long)]
    strategy: Option<String>,

    #[arg(long)]
    tolerance: Option<f64>,

    #[arg(long)]
    max_iterations: Option<u32>,
}

/// One element of the response array
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchEntry<'a> {
    Response(&'a CalculationResponse),
    Error { status: &'static str, message: String },
}

/// Key outputs of one request
#[derive(Debug, Serialize)]
struct SummaryRow {
    index: usize,
    calculation_age: f64,
    capped_max_ltv_value: f64,
    minimum_annual_payment: f64,
    first_year_draw: f64,
    total_payout: f64,
    qualifies: String,
    residual: Option<f64>,
    error: Option<String>,
}

impl SummaryRow {
    fn from_evaluation(index: usize, evaluation: &Evaluation) -> Self {
        let wb = &evaluation.workbook;
        let qualifies = wb
            .get(&layout::QUALIFIES)
            .and_then(|v| v.as_text().map(str::to_string))
            .unwrap_or_default();
        SummaryRow {
            index,
            calculation_age: wb.number(&layout::CALCULATION_AGE),
            capped_max_ltv_value: wb.number(&layout::CAPPED_MAX_LTV_VALUE),
            minimum_annual_payment: wb.number(&layout::MINIMUM_ANNUAL_PAYMENT),
            first_year_draw: wb.number(&layout::FIRST_YEAR_DRAW),
            total_payout: wb.number(&layout::TOTAL_PAYOUT),
            qualifies,
            residual: evaluation.reports.last().map(|r| r.outcome.residual),
            error: None,
        }
    }

    fn failed(index: usize, message: String) -> Self {
        SummaryRow {
            index,
            calculation_age: 0.0,
            capped_max_ltv_value: 0.0,
            minimum_annual_payment: 0.0,
            first_year_draw: 0.0,
            total_payout: 0.0,
            qualifies: String::new(),
            residual: None,
            error: Some(message),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    let text = fs::read_to_string(&args.requests).with_context(|| format!("reading {}", args.requests.display()))?;
    let requests: Vec<CalculationRequest> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", args.requests.display()))?;
    eprintln!("Loaded {} requests in {:?}", requests.len(), start.elapsed());

    let config = match &args.strategy {
        Some(name) => CalculationConfig::new(
            strategy_from_name(name, args.tolerance, args.max_iterations)
                .with_context(|| format!("unknown strategy {:?}", name))?,
        ),
        None => CalculationConfig::from_env(),
    };
    let dataset = StaticDataset::embedded()?;

    let calc_start = Instant::now();
    let results: Vec<_> = requests
        .par_iter()
        .map(|request| request.evaluate(dataset, &config))
        .collect();
    eprintln!("Calculated {} requests in {:?}", results.len(), calc_start.elapsed());

    let mut responses = Vec::with_capacity(results.len());
    let mut summary = Vec::with_capacity(results.len());
    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(evaluation) => {
                responses.push(BatchEntry::Response(&evaluation.response));
                summary.push(SummaryRow::from_evaluation(index, evaluation));
            }
            Err(e) => {
                log::error!("Request {} failed: {}", index, e);
                responses.push(BatchEntry::Error {
                    status: "error",
                    message: e.to_string(),
                });
                summary.push(SummaryRow::failed(index, e.to_string()));
            }
        }
    }

    let json = serde_json::to_string_pretty(&responses)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote responses to {}", path.display());
        }
        None => println!("{}", json),
    }

    if let Some(path) = &args.summary_csv {
        let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
        for row in &summary {
            writer.serialize(row)?;
        }
        writer.flush()?;
        eprintln!("Wrote summary to {}", path.display());
    }

    let failed = summary.iter().filter(|r| r.error.is_some()).count();
    eprintln!("Done: {} ok, {} failed, total {:?}", summary.len() - failed, failed, start.elapsed());
    Ok(())
}
