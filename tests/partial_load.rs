//! End-to-end load over a local directory: one data set is malformed, the
//! rest still aggregate.

use betascope::app::pipeline::{RunConfig, load_from};
use betascope::beta::{AggregateQuery, IndustryMatch, aggregate, compare_sectors};
use betascope::data::LocalSource;
use betascope::domain::{Period, Region, Weighting};

const US_2024: &str = "\
Date updated:,05-Jan-24
Created by:,Aswath Damodaran
,
Industry Name,Number of firms,Beta,D/E Ratio,Effective Tax rate,Unlevered beta
Banking (Regional),600,0.45,62.36%,21.50%,0.30
Software (System & Application),\"1,200\",1.23,5.10%,6.20%,1.18
Total Market,\"5,989\",1.03,27.11%,10.97%,0.86
";

const US_2023: &str = "\
Industry Name,Number of firms,Beta,D/E Ratio,Effective Tax rate,Unlevered beta
Banking (Regional),575,0.55,58.00%,20.00%,0.38
Software (System & Application),400,1.31,4.00%,5.00%,1.27
";

// No beta column: this data set must fail on its own.
const EUROPE_2024: &str = "\
Industry Name,Number of firms,D/E Ratio
Banking,120,80.00%
";

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("betas24.csv"), US_2024).unwrap();
    std::fs::write(dir.path().join("betas23.csv"), US_2023).unwrap();
    std::fs::write(dir.path().join("betaEurope24.csv"), EUROPE_2024).unwrap();
    dir
}

fn config() -> RunConfig {
    RunConfig {
        regions: vec![Region::US, Region::Europe],
        periods: vec![Period::Year(2023), Period::Year(2024)],
        ..RunConfig::default()
    }
}

#[test]
fn bad_data_set_fails_alone() {
    let dir = fixture_dir();
    let report = load_from(&LocalSource::new(dir.path()), &config()).unwrap();

    // US 2023 + US 2024 load; Europe 2024 lacks a beta column; Europe 2023 is missing.
    assert_eq!(report.loaded.len(), 2);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.id.region == Region::Europe));

    // Total Market is not an industry.
    assert_eq!(report.records.len(), 4);
    let rows = aggregate(&report.records, &AggregateQuery::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.region == Region::US));
}

#[test]
fn weighted_average_over_loaded_years() {
    let dir = fixture_dir();
    let report = load_from(&LocalSource::new(dir.path()), &config()).unwrap();

    let query = AggregateQuery {
        weighting: Weighting::FirmCount,
        ..AggregateQuery::for_industry(IndustryMatch::Contains("software".into()))
    };
    let rows = aggregate(&report.records, &query).unwrap();
    assert_eq!(rows.len(), 1);

    // (1.31 * 400 + 1.23 * 1200) / 1600
    let expected = (1.31 * 400.0 + 1.23 * 1200.0) / 1600.0;
    assert!((rows[0].average().unwrap() - expected).abs() < 1e-12);
    assert_eq!(rows[0].period_range, (Period::Year(2023), Period::Year(2024)));
    assert_eq!(rows[0].latest_firm_count, Some(1200));
}

#[test]
fn comparison_reports_unknown_sectors() {
    let dir = fixture_dir();
    let report = load_from(&LocalSource::new(dir.path()), &config()).unwrap();

    let sectors = vec!["Software".to_string(), "Banking".to_string(), "Shipbuilding".to_string()];
    let comparison = compare_sectors(&report.records, &sectors, &config().compare_options()).unwrap();

    assert_eq!(comparison.rows.len(), 2);
    assert_eq!(comparison.rows[0].sector, "Software");
    assert_eq!(comparison.not_found, vec!["Shipbuilding".to_string()]);
}
