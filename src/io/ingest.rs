//! Schema mapping of raw beta tables into typed records.
//!
//! This module turns the heterogeneous Damodaran layouts (title rows above
//! the header, `Beta ` with trailing spaces, percentages as text or as
//! numbers) into `BetaRecord`s. It is the only place that looks at header
//! text; everything downstream works on typed records.
//!
//! Design goals:
//! - **Strict schema** for required fields (industry name + levered beta)
//! - **Row-level filtering** (drop non-industry rows, but report them)
//! - **Explicit units**: every ratio carries the unit it was read in
//! - **Partial success**: one bad data set never aborts the others

use std::collections::HashMap;

use thiserror::Error;

use crate::beta::{BetaError, DatasetId, hamada_unlever};
use crate::data::{DataError, RawTable};
use crate::domain::{BetaRecord, BetaRecordSet, Ratio, UnitPolicy};

const INDUSTRY_COLUMN: &str = "Industry Name";
const BETA_COLUMN: &str = "Beta";

/// Header aliases per typed field, plus the unit policy of each ratio column.
///
/// Aliases are compared after normalization (trimmed, lower-cased, BOM
/// stripped, inner whitespace collapsed).
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    pub industry: Vec<String>,
    pub levered_beta: Vec<String>,
    pub unlevered_beta: Vec<String>,
    pub cash_adjusted_unlevered_beta: Vec<String>,
    pub debt_to_equity: Vec<String>,
    pub tax_rate: Vec<String>,
    pub cash_to_firm_value: Vec<String>,
    pub firm_count: Vec<String>,
    pub debt_to_equity_unit: UnitPolicy,
    pub tax_rate_unit: UnitPolicy,
    pub cash_to_firm_value_unit: UnitPolicy,
}

impl Default for SchemaMapping {
    fn default() -> Self {
        fn aliases(names: &[&str]) -> Vec<String> {
            names.iter().map(|n| normalize_header_name(n)).collect()
        }

        Self {
            industry: aliases(&["Industry Name", "Industry"]),
            levered_beta: aliases(&["Beta", "Levered Beta", "Average Levered Beta"]),
            unlevered_beta: aliases(&["Unlevered beta"]),
            cash_adjusted_unlevered_beta: aliases(&["Unlevered beta corrected for cash"]),
            debt_to_equity: aliases(&["D/E Ratio", "Debt/Equity", "D/E"]),
            tax_rate: aliases(&["Effective Tax rate", "Tax rate"]),
            cash_to_firm_value: aliases(&["Cash/Firm value"]),
            firm_count: aliases(&["Number of firms"]),
            debt_to_equity_unit: UnitPolicy::Auto,
            tax_rate_unit: UnitPolicy::Auto,
            cash_to_firm_value_unit: UnitPolicy::Auto,
        }
    }
}

impl SchemaMapping {
    /// Apply one unit policy to every ratio column.
    pub fn with_ratio_unit(mut self, policy: UnitPolicy) -> Self {
        self.debt_to_equity_unit = policy;
        self.tax_rate_unit = policy;
        self.cash_to_firm_value_unit = policy;
        self
    }
}

/// Column indexes resolved from one header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedSchema {
    industry: usize,
    levered_beta: usize,
    unlevered_beta: Option<usize>,
    cash_adjusted_unlevered_beta: Option<usize>,
    debt_to_equity: Option<usize>,
    tax_rate: Option<usize>,
    cash_to_firm_value: Option<usize>,
    firm_count: Option<usize>,
}

/// Why a row was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingIndustry,
    RepeatedHeader,
    TotalMarket,
}

/// A data row that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// 1-based row number in the source grid.
    pub line: usize,
    pub label: Option<String>,
    pub reason: DropReason,
}

/// Ingest output for one data set.
#[derive(Debug, Clone)]
pub struct IngestedDataset {
    pub id: DatasetId,
    pub records: Vec<BetaRecord>,
    /// 1-based row number of the header in the source grid.
    pub header_line: usize,
    pub rows_read: usize,
    pub rows_used: usize,
    pub dropped: Vec<DroppedRow>,
    /// Informational notes about how ratio units were interpreted.
    pub unit_notes: Vec<String>,
}

/// Why a data set contributed nothing.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error(transparent)]
    Fetch(#[from] DataError),
    #[error(transparent)]
    Ingest(#[from] BetaError),
}

#[derive(Debug)]
pub struct DatasetFailure {
    pub id: DatasetId,
    pub source: String,
    pub error: LoadFailure,
}

/// Outcome of ingesting many data sets: the merged records plus per-set status.
#[derive(Debug)]
pub struct LoadReport {
    pub records: BetaRecordSet,
    pub loaded: Vec<IngestedDataset>,
    pub failures: Vec<DatasetFailure>,
}

impl LoadReport {
    /// `NoData` when not a single data set was loaded.
    pub fn ensure_loaded(self) -> Result<Self, BetaError> {
        if self.loaded.is_empty() {
            return Err(BetaError::NoData);
        }
        Ok(self)
    }
}

/// Map one raw table to typed records.
pub fn ingest_table(table: &RawTable, id: DatasetId, mapping: &SchemaMapping) -> Result<IngestedDataset, BetaError> {
    let header_idx = locate_header_row(table, mapping).ok_or_else(|| BetaError::Schema {
        dataset: id,
        column: INDUSTRY_COLUMN.to_string(),
    })?;
    let header_map = build_header_map(&table.rows[header_idx]);
    let schema = resolve_schema(&header_map, mapping, id)?;

    let mut kept: Vec<(&[String], String)> = Vec::new();
    let mut dropped = Vec::new();
    let mut rows_read = 0usize;

    for (offset, row) in table.rows[header_idx + 1..].iter().enumerate() {
        let line = header_idx + offset + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows_read += 1;

        let label = get_optional(row, schema.industry).map(collapse_whitespace);
        match classify_industry(label.as_deref(), mapping) {
            Ok(()) => {
                if let Some(label) = label {
                    kept.push((row.as_slice(), label));
                }
            }
            Err(reason) => dropped.push(DroppedRow { line, label, reason }),
        }
    }

    let mut unit_notes = Vec::new();
    let de = ratio_column(&kept, schema.debt_to_equity, mapping.debt_to_equity_unit, "D/E", &mut unit_notes);
    let tax = ratio_column(&kept, schema.tax_rate, mapping.tax_rate_unit, "tax rate", &mut unit_notes);
    let cash = ratio_column(
        &kept,
        schema.cash_to_firm_value,
        mapping.cash_to_firm_value_unit,
        "cash/firm value",
        &mut unit_notes,
    );

    let records: Vec<BetaRecord> = kept
        .iter()
        .enumerate()
        .map(|(i, (row, industry))| {
            let mut record = BetaRecord::new(id.region, industry.clone(), id.period);
            record.levered_beta = parse_opt_f64(get_optional(row, schema.levered_beta));
            record.unlevered_beta = schema.unlevered_beta.and_then(|c| parse_opt_f64(get_optional(row, c)));
            record.cash_adjusted_unlevered_beta = schema
                .cash_adjusted_unlevered_beta
                .and_then(|c| parse_opt_f64(get_optional(row, c)));
            record.debt_to_equity = de[i];
            record.tax_rate = tax[i];
            record.cash_to_firm_value = cash[i];
            record.firm_count = schema
                .firm_count
                .and_then(|c| parse_opt_f64(get_optional(row, c)))
                .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
                .map(|n| n.round() as u32);
            derive_unlevered_beta(&mut record);
            record
        })
        .collect();

    Ok(IngestedDataset {
        id,
        rows_used: records.len(),
        records,
        header_line: header_idx + 1,
        rows_read,
        dropped,
        unit_notes,
    })
}

/// Ingest many fetched data sets; failures are collected, not propagated.
///
/// Only when nothing at all could be loaded is the result `NoData`.
pub fn ingest_all<I, F>(fetched: I, mapping: &SchemaMapping, describe: F) -> Result<LoadReport, BetaError>
where
    I: IntoIterator<Item = (DatasetId, Result<RawTable, DataError>)>,
    F: Fn(DatasetId) -> String,
{
    ingest_each(fetched, mapping, describe).ensure_loaded()
}

/// Like `ingest_all`, but returns the report even when every data set failed.
pub fn ingest_each<I, F>(fetched: I, mapping: &SchemaMapping, describe: F) -> LoadReport
where
    I: IntoIterator<Item = (DatasetId, Result<RawTable, DataError>)>,
    F: Fn(DatasetId) -> String,
{
    let mut records = BetaRecordSet::new();
    let mut loaded = Vec::new();
    let mut failures = Vec::new();

    for (id, result) in fetched {
        let outcome = result
            .map_err(LoadFailure::from)
            .and_then(|table| ingest_table(&table, id, mapping).map_err(LoadFailure::from));
        match outcome {
            Ok(mut dataset) => {
                records.extend(std::mem::take(&mut dataset.records));
                loaded.push(dataset);
            }
            Err(error) => failures.push(DatasetFailure {
                id,
                source: describe(id),
                error,
            }),
        }
    }

    LoadReport {
        records,
        loaded,
        failures,
    }
}

/// Index of the first row carrying an industry-column header.
pub fn locate_header_row(table: &RawTable, mapping: &SchemaMapping) -> Option<usize> {
    table.rows.iter().position(|row| {
        row.iter()
            .any(|cell| mapping.industry.contains(&normalize_header_name(cell)))
    })
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let key = normalize_header_name(name);
        if !key.is_empty() {
            map.entry(key).or_insert(idx);
        }
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. Damodaran headers also carry stray spaces and line breaks.
    let name = name.trim().trim_start_matches('\u{feff}');
    collapse_whitespace(name).to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(a).copied())
}

fn resolve_schema(
    header_map: &HashMap<String, usize>,
    mapping: &SchemaMapping,
    id: DatasetId,
) -> Result<ResolvedSchema, BetaError> {
    let industry = find_column(header_map, &mapping.industry).ok_or_else(|| BetaError::Schema {
        dataset: id,
        column: INDUSTRY_COLUMN.to_string(),
    })?;
    let levered_beta = find_column(header_map, &mapping.levered_beta).ok_or_else(|| BetaError::Schema {
        dataset: id,
        column: BETA_COLUMN.to_string(),
    })?;

    Ok(ResolvedSchema {
        industry,
        levered_beta,
        unlevered_beta: find_column(header_map, &mapping.unlevered_beta),
        cash_adjusted_unlevered_beta: find_column(header_map, &mapping.cash_adjusted_unlevered_beta),
        debt_to_equity: find_column(header_map, &mapping.debt_to_equity),
        tax_rate: find_column(header_map, &mapping.tax_rate),
        cash_to_firm_value: find_column(header_map, &mapping.cash_to_firm_value),
        firm_count: find_column(header_map, &mapping.firm_count),
    })
}

fn classify_industry(label: Option<&str>, mapping: &SchemaMapping) -> Result<(), DropReason> {
    let Some(label) = label.filter(|l| !l.is_empty()) else {
        return Err(DropReason::MissingIndustry);
    };
    let lowered = label.to_lowercase();
    if lowered == "nan" {
        return Err(DropReason::MissingIndustry);
    }
    if mapping.industry.contains(&lowered) {
        return Err(DropReason::RepeatedHeader);
    }
    if lowered.contains("total market") {
        return Err(DropReason::TotalMarket);
    }
    Ok(())
}

/// A numeric cell, remembering whether it carried a `%` suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NumericCell {
    value: f64,
    percent: bool,
}

fn parse_numeric_cell(raw: &str) -> Option<NumericCell> {
    let s = raw.trim();
    let (body, percent) = match s.strip_suffix('%') {
        Some(body) => (body.trim_end(), true),
        None => (s, false),
    };
    let v = parse_opt_f64(Some(body))?;
    Some(NumericCell { value: v, percent })
}

/// Resolve a ratio column to fractions under `policy`.
fn ratio_column(
    rows: &[(&[String], String)],
    column: Option<usize>,
    policy: UnitPolicy,
    label: &str,
    notes: &mut Vec<String>,
) -> Vec<Option<Ratio>> {
    let Some(column) = column else {
        return vec![None; rows.len()];
    };

    let cells: Vec<Option<NumericCell>> = rows
        .iter()
        .map(|(row, _)| get_optional(row, column).and_then(parse_numeric_cell))
        .collect();

    let as_ratio = |cell: NumericCell, bare_is_percent: bool| {
        if cell.percent || bare_is_percent {
            Ratio::from_percent(cell.value)
        } else {
            Ratio::fraction(cell.value)
        }
    };

    match policy {
        UnitPolicy::Fraction => cells.into_iter().map(|c| c.map(|c| as_ratio(c, false))).collect(),
        UnitPolicy::Percent => cells.into_iter().map(|c| c.map(|c| as_ratio(c, true))).collect(),
        UnitPolicy::Auto => {
            // `%` cells are already tagged; only bare numbers are inferred.
            let bare_max = cells
                .iter()
                .flatten()
                .filter(|c| !c.percent)
                .map(|c| c.value)
                .fold(f64::NEG_INFINITY, f64::max);
            let bare_is_percent = bare_max > 1.0;
            if bare_is_percent {
                notes.push(format!("{label}: auto percent→fraction (÷100)"));
            }
            cells
                .into_iter()
                .map(|c| c.map(|c| as_ratio(c, bare_is_percent)))
                .collect()
        }
    }
}

fn derive_unlevered_beta(record: &mut BetaRecord) {
    if record.unlevered_beta.is_some() {
        return;
    }
    if let (Some(beta), Some(de), Some(tax)) = (record.levered_beta, record.debt_to_equity, record.tax_rate) {
        record.unlevered_beta = hamada_unlever(beta, de.value(), tax.value());
    }
}

fn get_optional(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
