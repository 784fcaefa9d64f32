//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments into a `RunConfig`
//! - loads the selected data sets (load log on stderr)
//! - runs the requested query
//! - prints reports and writes optional exports

use std::fs::File;

use clap::Parser;

use crate::beta::{Target, aggregate, analyze_sector, available_industries, compare_sectors, pooled_average, require_matches};
use crate::cli::{
    AnalysisArgs, AverageArgs, Command, CompareArgs, FxVolArgs, HhiArgs, IndustriesArgs, RatingArgs, SectorArgs,
    SourceArgs,
};
use crate::data::FredClient;
use crate::domain::{Period, UnleverBasis, Weighting};
use crate::error::AppError;
use crate::metrics::concentration::{Portfolio, concentration};
use crate::metrics::rating::weighted_rating;
use crate::metrics::volatility::{annualized_volatility, window_rows};

pub mod pipeline;

use pipeline::RunConfig;

/// Entry point for the `betascope` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Average(args) => handle_average(args),
        Command::Sector(args) => handle_sector(args),
        Command::Compare(args) => handle_compare(args),
        Command::Industries(args) => handle_industries(args),
        Command::FxVol(args) => handle_fx_vol(args),
        Command::Hhi(args) => handle_hhi(args),
        Command::Rating(args) => handle_rating(args),
    }
}

fn handle_average(args: AverageArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, Some(&args.analysis))?;
    let loaded = pipeline::load_datasets(&config)?;

    let query = config.aggregate_query(args.industry.as_deref());
    let results = if args.require_match {
        require_matches(&loaded.records, &query)?
    } else {
        aggregate(&loaded.records, &query)?
    };

    println!("{}", crate::report::format_aggregates(&results, &query.describe()));

    if let Some(path) = &config.export_csv {
        crate::io::export::write_aggregate_csv(path, &results)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_aggregate_json(path, &results, &query.describe())?;
    }

    Ok(())
}

fn handle_sector(args: SectorArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, Some(&args.analysis))?;
    let loaded = pipeline::load_datasets(&config)?;

    let query = config.aggregate_query(Some(&args.sector));
    let observations = analyze_sector(&loaded.records, &query)?;
    let pooled = pooled_average(&observations, config.weighting);

    println!("{}", crate::report::format_sector(&args.sector, &observations, pooled));

    if let Some(path) = &config.export_csv {
        crate::io::export::write_sector_csv(path, &observations)?;
    }

    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, Some(&args.analysis))?;
    let loaded = pipeline::load_datasets(&config)?;

    let comparison = compare_sectors(&loaded.records, &args.sectors, &config.compare_options())?;

    println!("{}", crate::report::format_comparison(&comparison));

    if let Some(path) = &config.export_csv {
        crate::io::export::write_comparison_csv(path, &comparison)?;
    }

    Ok(())
}

fn handle_industries(args: IndustriesArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, None)?;
    let loaded = pipeline::load_datasets(&config)?;

    // A single requested region lists that region only; otherwise the union.
    let region = match config.regions.as_slice() {
        [only] => Some(*only),
        _ => None,
    };
    let industries = available_industries(&loaded.records, region);

    println!("{}", crate::report::format_industries(&industries));
    Ok(())
}

fn handle_fx_vol(args: FxVolArgs) -> Result<(), AppError> {
    let client = FredClient::from_env()?;
    let via = if client.uses_api_key() { "FRED API" } else { "fredgraph.csv" };
    eprintln!("Fetching {} via {via}...", args.series);
    let series = client.fetch_series(&args.series)?;
    let report = annualized_volatility(&series, args.window, args.trading_days)?;

    println!("{}", crate::report::format_fx_volatility(&args.series, &report));

    if let Some(path) = &args.export {
        crate::io::export::write_fx_window_csv(path, &window_rows(&series, &report))?;
    }

    Ok(())
}

fn handle_hhi(args: HhiArgs) -> Result<(), AppError> {
    let file = File::open(&args.input)
        .map_err(|e| AppError::new(2, format!("Failed to open portfolio CSV '{}': {e}", args.input.display())))?;
    let portfolio = Portfolio::from_csv(file, &args.id_column, args.mode)?;
    let report = concentration(&portfolio, args.mode)?;

    println!("{}", crate::report::format_concentration(&report));

    if let Some(path) = &args.export {
        crate::io::export::write_shares_csv(path, &report)?;
    }

    Ok(())
}

fn handle_rating(args: RatingArgs) -> Result<(), AppError> {
    let result = weighted_rating(&args.ratings)?;
    println!("{}", crate::report::format_rating(&result));
    Ok(())
}

/// Resolve CLI options into a `RunConfig`.
///
/// Years run `--from..=--to`; with no year at all only the current data set is loaded.
pub fn run_config_from_args(source: &SourceArgs, analysis: Option<&AnalysisArgs>) -> Result<RunConfig, AppError> {
    let mut periods: Vec<Period> = match (source.from, source.to) {
        (None, None) => Vec::new(),
        (Some(year), None) | (None, Some(year)) => vec![Period::Year(year)],
        (Some(from), Some(to)) => {
            if from > to {
                return Err(AppError::new(2, format!("--from {from} is after --to {to}.")));
            }
            (from..=to).map(Period::Year).collect()
        }
    };
    if source.current || periods.is_empty() {
        periods.push(Period::Current);
    }

    let mut config = RunConfig {
        regions: source.regions.clone(),
        periods,
        data_dir: source.data_dir.clone(),
        ratio_unit: source.ratio_unit,
        ..RunConfig::default()
    };

    if let Some(a) = analysis {
        let target = Target {
            debt_to_equity: a.target_de,
            tax_rate: a.target_tax,
        };
        target.validate()?;

        config.weighting = if a.weighted { Weighting::FirmCount } else { Weighting::Simple };
        config.target = (!target.is_identity()).then_some(target);
        config.basis = if a.cash_adjusted {
            UnleverBasis::CashAdjusted
        } else {
            UnleverBasis::Unlevered
        };
        config.exact = a.exact;
        config.export_csv = a.export.clone();
        config.export_json = a.export_json.clone();
    }

    Ok(config)
}
