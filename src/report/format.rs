//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized

use crate::beta::{AggregateResult, SectorComparison, SectorObservation};
use crate::domain::Period;
use crate::io::ingest::LoadReport;
use crate::metrics::concentration::ConcentrationReport;
use crate::metrics::rating::WeightedRating;
use crate::metrics::volatility::VolatilityReport;

const INDUSTRY_WIDTH: usize = 36;

/// One line per data set that failed to load.
pub fn format_load_warnings(report: &LoadReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|f| format!("{} skipped ({}): {}", f.id, f.source, f.error))
        .collect()
}

/// Dataset counts and per-set row statistics.
pub fn format_load_summary(report: &LoadReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Data sets: loaded={} failed={} | records={}\n",
        report.loaded.len(),
        report.failures.len(),
        report.records.len(),
    ));
    for ds in &report.loaded {
        out.push_str(&format!(
            "- {}: header at row {}, {} rows used, {} dropped\n",
            ds.id,
            ds.header_line,
            ds.rows_used,
            ds.dropped.len()
        ));
        for note in &ds.unit_notes {
            out.push_str(&format!("    {note}\n"));
        }
    }

    out
}

/// Aggregate table. Target columns appear only when a target was applied.
pub fn format_aggregates(results: &[AggregateResult], query: &str) -> String {
    let mut out = String::new();
    let with_target = results.iter().any(|r| r.target.is_some());

    out.push_str(&format!("=== Average levered beta ({query}) ===\n"));
    if results.is_empty() {
        out.push_str("No matching industries.\n");
        return out;
    }

    let mut header = format!(
        "{:<8} {:<width$} {:<14} {:>3} {:>8} {:>8}",
        "region",
        "industry",
        "periods",
        "n",
        "beta",
        "firms",
        width = INDUSTRY_WIDTH
    );
    if with_target {
        header.push_str(&format!(" {:>8} {:>8} {:>8}", "observed", "D/E", "tax"));
    }
    push_line(&mut out, &header);
    push_line(&mut out, &"-".repeat(header.len()));

    for r in results {
        let mut line = format!(
            "{:<8} {:<width$} {:<14} {:>3} {:>8} {:>8}",
            r.region.label(),
            truncate(&r.industry, INDUSTRY_WIDTH),
            fmt_range(r.period_range),
            r.observation_count,
            fmt_opt(r.average_levered_beta, 3),
            fmt_opt(r.average_firm_count, 0),
            width = INDUSTRY_WIDTH
        );
        if let Some(t) = r.target {
            line.push_str(&format!(
                " {:>8} {:>8} {:>8}",
                fmt_opt(r.observed_levered_beta, 3),
                fmt_pct(t.debt_to_equity),
                fmt_pct(t.tax_rate),
            ));
        }
        push_line(&mut out, &line);
    }

    out
}

/// Per-observation detail for one sector plus the pooled average.
pub fn format_sector(sector: &str, observations: &[SectorObservation], pooled: Option<f64>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Sector: {sector} ===\n"));
    if observations.is_empty() {
        out.push_str("No observations.\n");
        return out;
    }

    let with_target = observations.iter().any(|o| o.target_levered_beta.is_some());
    let mut header = format!(
        "{:<8} {:<width$} {:<8} {:>6} {:>7} {:>8} {:>7} {:>8}",
        "region",
        "industry",
        "period",
        "firms",
        "beta",
        "D/E",
        "tax",
        "unlev",
        width = INDUSTRY_WIDTH
    );
    if with_target {
        header.push_str(&format!(" {:>8}", "target"));
    }
    push_line(&mut out, &header);
    push_line(&mut out, &"-".repeat(header.len()));

    for o in observations {
        let mut line = format!(
            "{:<8} {:<width$} {:<8} {:>6} {:>7} {:>8} {:>7} {:>8}",
            o.region.label(),
            truncate(&o.industry, INDUSTRY_WIDTH),
            o.period.to_string(),
            o.firm_count.map(|f| f.to_string()).unwrap_or_else(|| "-".into()),
            fmt_opt(o.levered_beta, 3),
            fmt_pct(o.debt_to_equity),
            fmt_pct(o.tax_rate),
            fmt_opt(o.unlevered_beta, 3),
            width = INDUSTRY_WIDTH
        );
        if with_target {
            line.push_str(&format!(" {:>8}", fmt_opt(o.target_levered_beta, 3)));
        }
        push_line(&mut out, &line);
    }

    out.push_str(&format!("\nPooled average: {}\n", fmt_opt(pooled, 4)));
    out
}

pub fn format_comparison(comparison: &SectorComparison) -> String {
    let mut out = String::new();

    out.push_str("=== Sector comparison ===\n");
    let header = format!(
        "{:<width$} {:>8} {:>8} {:>8} {:>8}",
        "sector",
        "beta",
        "regions",
        "firms",
        "matches",
        width = INDUSTRY_WIDTH
    );
    push_line(&mut out, &header);
    push_line(&mut out, &"-".repeat(header.len()));

    for row in &comparison.rows {
        push_line(
            &mut out,
            &format!(
                "{:<width$} {:>8} {:>8} {:>8} {:>8}",
                truncate(&row.sector, INDUSTRY_WIDTH),
                fmt_opt(row.average_levered_beta, 3),
                row.region_count,
                row.total_firms,
                row.match_count,
                width = INDUSTRY_WIDTH
            ),
        );
    }

    for sector in &comparison.not_found {
        out.push_str(&format!("(not found) {sector}\n"));
    }

    out
}

pub fn format_industries(industries: &[String]) -> String {
    let mut out = format!("{} industries:\n", industries.len());
    for name in industries {
        out.push_str(&format!("  {name}\n"));
    }
    out
}

pub fn format_fx_volatility(series_id: &str, report: &VolatilityReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {series_id} historical volatility ===\n"));
    out.push_str(&format!(
        "Window: {} returns ({} to {})\n",
        report.obs_count, report.start_date, report.end_date
    ));
    out.push_str(&format!("Last spot: {:.4} on {}\n", report.last_spot, report.last_spot_date));
    out.push_str(&format!("Daily stdev: {:.6}\n", report.stdev_daily));
    out.push_str(&format!(
        "Annualized ({}d): {:.2}%\n",
        report.trading_days,
        report.vol_annualized * 100.0
    ));
    out.push_str(&format!(
        "Annualized (365d): {:.2}%\n",
        report.vol_annualized_calendar * 100.0
    ));

    out
}

pub fn format_concentration(report: &ConcentrationReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Portfolio concentration (mode={}) ===\n", report.mode.label()));
    out.push_str(&format!("Deals: {}\n", report.rows.len()));
    out.push_str(&format!("HHI: {:.4}\n", report.hhi.value));
    match (report.hhi.normalized, report.level) {
        (Some(norm), Some(level)) => {
            out.push_str(&format!("HHI* (normalized): {norm:.4} -> {}\n", level.label()));
        }
        _ => out.push_str("HHI* (normalized): n/a (single deal)\n"),
    }
    out.push('\n');

    let header = format!("{:<24} {:>9} {:>10} {:>8}", "deal", "share", "share^2", "tvpi");
    push_line(&mut out, &header);
    push_line(&mut out, &"-".repeat(header.len()));
    for r in &report.rows {
        push_line(
            &mut out,
            &format!(
                "{:<24} {:>8.2}% {:>10.4} {:>8}",
                truncate(&r.id, 24),
                r.share * 100.0,
                r.share_squared,
                fmt_opt(r.tvpi, 2),
            ),
        );
    }

    out
}

pub fn format_rating(result: &WeightedRating) -> String {
    let mut out = String::new();

    push_line(&mut out, &format!("{:>8} {:>10}", "rating", "weight"));
    for (r, w) in result.ratings.iter().zip(&result.weights) {
        push_line(&mut out, &format!("{r:>8.2} {:>9.2}%", w * 100.0));
    }
    out.push_str(&format!("Weighted rating: {:.4}\n", result.average));

    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_range((start, end): (Period, Period)) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beta::{ComparisonRow, TargetBeta};
    use crate::domain::Region;

    fn result(target: Option<TargetBeta>) -> AggregateResult {
        AggregateResult {
            region: Region::US,
            industry: "Banking (Regional)".to_string(),
            average_levered_beta: Some(1.05),
            observed_levered_beta: Some(1.0),
            period_range: (Period::Year(2023), Period::Year(2024)),
            observation_count: 2,
            average_firm_count: Some(20.0),
            latest_firm_count: Some(30),
            target,
        }
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("Banking", 10), "Banking");
        assert_eq!(truncate("Semiconductor Equipment", 10), "Semicondu.");
        assert_eq!(truncate("Semiconductor Equipment", 10).chars().count(), 10);
    }

    #[test]
    fn aggregate_table_lists_each_group() {
        let text = format_aggregates(&[result(None)], "all industries");
        assert!(text.contains("Banking (Regional)"));
        assert!(text.contains("2023-2024"));
        assert!(text.contains("1.050"));
        assert!(!text.contains("observed"));
    }

    #[test]
    fn aggregate_table_shows_target_columns() {
        let target = TargetBeta {
            levered_beta: Some(1.05),
            debt_to_equity: Some(0.5),
            tax_rate: Some(0.25),
        };
        let text = format_aggregates(&[result(Some(target))], "banking");
        assert!(text.contains("observed"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("25.00%"));
    }

    #[test]
    fn empty_aggregate_says_so() {
        assert!(format_aggregates(&[], "x").contains("No matching industries."));
    }

    #[test]
    fn comparison_lists_unmatched_sectors() {
        let comparison = SectorComparison {
            rows: vec![ComparisonRow {
                sector: "Software".to_string(),
                average_levered_beta: Some(1.2),
                region_count: 2,
                total_firms: 300,
                match_count: 3,
            }],
            not_found: vec!["Unicorns".to_string()],
        };
        let text = format_comparison(&comparison);
        assert!(text.contains("Software"));
        assert!(text.contains("(not found) Unicorns"));
    }

    #[test]
    fn rating_output_ends_with_average() {
        let result = WeightedRating {
            ratings: vec![2.0, 4.0],
            weights: vec![0.4, 0.6],
            average: 3.2,
        };
        let text = format_rating(&result);
        assert!(text.contains("40.00%"));
        assert!(text.trim_end().ends_with("Weighted rating: 3.2000"));
    }
}
