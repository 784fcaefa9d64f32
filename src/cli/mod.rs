//! Command-line parsing for the industry beta toolkit.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the aggregation code. Nothing outside `app` sees these types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::fred::SERIES_USD_PER_EUR;
use crate::domain::{Region, UnitPolicy};
use crate::metrics::concentration::ShareMode;
use crate::metrics::volatility::{DEFAULT_WINDOW, TRADING_DAYS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "betascope",
    version,
    about = "Industry beta aggregation over Damodaran data sets, plus a few portfolio metrics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Average levered beta per (region, industry) over the selected periods.
    Average(AverageArgs),
    /// Per-period detail for every industry matching one sector name.
    Sector(SectorArgs),
    /// Compare several sectors side by side.
    Compare(CompareArgs),
    /// List the industry names present in the loaded data sets.
    Industries(IndustriesArgs),
    /// Annualized FX volatility from a FRED daily series.
    FxVol(FxVolArgs),
    /// Herfindahl-Hirschman concentration of a PE portfolio CSV.
    Hhi(HhiArgs),
    /// Log-amplified weighted average of risk ratings.
    Rating(RatingArgs),
}

/// Which data sets to load and from where.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Region(s) to load; repeat the flag for several. Defaults to all regions.
    #[arg(short = 'r', long = "region", value_enum)]
    pub regions: Vec<Region>,

    /// First archived year to load (e.g. 2019).
    #[arg(long)]
    pub from: Option<i32>,

    /// Last archived year to load (defaults to `--from`).
    #[arg(long)]
    pub to: Option<i32>,

    /// Also load the current data set. Implied when no year is given.
    #[arg(long)]
    pub current: bool,

    /// Read workbooks/CSVs from this directory instead of downloading them.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// How to read D/E, tax-rate and cash ratio cells without a `%` sign.
    #[arg(long, value_enum, default_value_t = UnitPolicy::Auto)]
    pub ratio_unit: UnitPolicy,
}

/// Weighting, re-levering and export options shared by the beta commands.
#[derive(Debug, Args, Clone)]
pub struct AnalysisArgs {
    /// Weight averages by firm count instead of equally.
    #[arg(long)]
    pub weighted: bool,

    /// Target debt-to-equity as a fraction (e.g. 0.5). Re-levers every beta.
    #[arg(long = "target-de", value_name = "RATIO")]
    pub target_de: Option<f64>,

    /// Target marginal tax rate as a fraction (e.g. 0.25). Re-levers every beta.
    #[arg(long = "target-tax", value_name = "RATE")]
    pub target_tax: Option<f64>,

    /// Re-lever from the cash-adjusted unlevered beta when present.
    #[arg(long)]
    pub cash_adjusted: bool,

    /// Match industry names exactly (case-insensitive) instead of by substring.
    #[arg(long)]
    pub exact: bool,

    /// Export results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export results to JSON (`average` only).
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AverageArgs {
    /// Restrict to industries matching this name.
    #[arg(short = 'i', long)]
    pub industry: Option<String>,

    /// Fail instead of printing an empty table when nothing matches.
    #[arg(long)]
    pub require_match: bool,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args)]
pub struct SectorArgs {
    /// Sector name (substring unless `--exact`).
    pub sector: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Sector names to compare.
    #[arg(required = true, num_args = 1..)]
    pub sectors: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args)]
pub struct IndustriesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct FxVolArgs {
    /// FRED series id.
    #[arg(long, default_value = SERIES_USD_PER_EUR)]
    pub series: String,

    /// Number of daily log returns in the window.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Trading days per year used to annualize.
    #[arg(long, default_value_t = TRADING_DAYS)]
    pub trading_days: u32,

    /// Export the prices and returns of the window to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HhiArgs {
    /// Portfolio CSV (Deal, TVPI, PaidIn, NAV, Distributions, ...).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Basis used to compute each deal's share.
    #[arg(long, value_enum, default_value_t = ShareMode::Value)]
    pub mode: ShareMode,

    /// Column holding the deal identifier.
    #[arg(long, default_value = "Deal")]
    pub id_column: String,

    /// Export per-deal shares to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RatingArgs {
    /// Ratings to combine (higher = riskier).
    #[arg(required = true, num_args = 1..)]
    pub ratings: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_regions_and_targets() {
        let cli = Cli::try_parse_from([
            "betascope", "average", "-r", "us", "-r", "europe", "--from", "2020", "--to", "2023",
            "--weighted", "--target-de", "0.5", "--target-tax", "0.25",
        ])
        .unwrap();
        let Command::Average(args) = cli.command else {
            panic!("expected average");
        };
        assert_eq!(args.source.regions, vec![Region::US, Region::Europe]);
        assert_eq!(args.source.from, Some(2020));
        assert!(args.analysis.weighted);
        assert_eq!(args.analysis.target_de, Some(0.5));
    }

    #[test]
    fn compare_requires_a_sector() {
        assert!(Cli::try_parse_from(["betascope", "compare"]).is_err());
        assert!(Cli::try_parse_from(["betascope", "fx-vol", "--window", "30"]).is_ok());
    }
}
