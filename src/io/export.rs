//! Export results to CSV or JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::beta::{AggregateResult, SectorComparison, SectorObservation};
use crate::domain::{Period, Region};
use crate::error::AppError;
use crate::metrics::concentration::ConcentrationReport;
use crate::metrics::volatility::WindowRow;

/// Flat, spreadsheet-friendly view of an `AggregateResult`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateRow<'a> {
    pub region: Region,
    pub industry: &'a str,
    pub start_period: Period,
    pub end_period: Period,
    pub average_levered_beta: Option<f64>,
    pub observed_levered_beta: Option<f64>,
    pub observation_count: usize,
    pub average_firm_count: Option<f64>,
    pub latest_firm_count: Option<u32>,
    pub target_levered_beta: Option<f64>,
    pub target_debt_to_equity: Option<f64>,
    pub target_tax_rate: Option<f64>,
}

impl<'a> From<&'a AggregateResult> for AggregateRow<'a> {
    fn from(r: &'a AggregateResult) -> Self {
        Self {
            region: r.region,
            industry: &r.industry,
            start_period: r.period_range.0,
            end_period: r.period_range.1,
            average_levered_beta: r.average_levered_beta,
            observed_levered_beta: r.observed_levered_beta,
            observation_count: r.observation_count,
            average_firm_count: r.average_firm_count,
            latest_firm_count: r.latest_firm_count,
            target_levered_beta: r.target.and_then(|t| t.levered_beta),
            target_debt_to_equity: r.target.and_then(|t| t.debt_to_equity),
            target_tax_rate: r.target.and_then(|t| t.tax_rate),
        }
    }
}

#[derive(Serialize)]
struct AggregateFile<'a> {
    tool: &'static str,
    query: &'a str,
    results: Vec<AggregateRow<'a>>,
}

#[derive(Serialize)]
struct ShareExportRow<'a> {
    id: &'a str,
    share: f64,
    share_squared: f64,
    tvpi: Option<f64>,
    paid_in: Option<f64>,
    nav: Option<f64>,
    distributions: Option<f64>,
    invested: Option<f64>,
    value_created: Option<f64>,
    mode: &'static str,
}

pub fn write_aggregate_csv(path: &Path, results: &[AggregateResult]) -> Result<(), AppError> {
    write_rows(path, results.iter().map(AggregateRow::from), "aggregate")
}

/// Write aggregate rows plus the query that produced them as pretty JSON.
pub fn write_aggregate_json(path: &Path, results: &[AggregateResult], query: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let payload = AggregateFile {
        tool: "betascope",
        query,
        results: results.iter().map(AggregateRow::from).collect(),
    };

    serde_json::to_writer_pretty(file, &payload)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;

    Ok(())
}

pub fn write_comparison_csv(path: &Path, comparison: &SectorComparison) -> Result<(), AppError> {
    write_rows(path, comparison.rows.iter(), "comparison")
}

pub fn write_sector_csv(path: &Path, observations: &[SectorObservation]) -> Result<(), AppError> {
    write_rows(path, observations.iter(), "sector")
}

/// Write the prices and log returns used for a volatility estimate.
pub fn write_fx_window_csv(path: &Path, rows: &[WindowRow]) -> Result<(), AppError> {
    write_rows(path, rows.iter(), "FX window")
}

pub fn write_shares_csv(path: &Path, report: &ConcentrationReport) -> Result<(), AppError> {
    let mode = report.mode.label();
    let rows = report.rows.iter().map(|r| ShareExportRow {
        id: &r.id,
        share: r.share,
        share_squared: r.share_squared,
        tvpi: r.tvpi,
        paid_in: r.paid_in,
        nav: r.nav,
        distributions: r.distributions,
        invested: r.invested,
        value_created: r.value_created,
        mode,
    });
    write_rows(path, rows, "shares")
}

fn write_rows<T, I>(path: &Path, rows: I, what: &str) -> Result<(), AppError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} CSV '{}': {e}", path.display())))?;

    for row in rows {
        wtr.serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write {what} CSV row: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush {what} CSV: {e}")))?;

    Ok(())
}
