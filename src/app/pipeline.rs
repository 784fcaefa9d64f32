//! Shared "load pipeline" used by every beta subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset grid -> parallel fetch -> ingest (partial success) -> typed record set
//!
//! The subcommands can then focus on the query they run and how they print it.

use std::io::Write;
use std::path::PathBuf;

use crate::beta::{AggregateQuery, CompareOptions, DatasetId, IndustryMatch, Target};
use crate::data::{BetaSource, DamodaranClient, LocalSource, fetch_all};
use crate::domain::{Period, Region, UnitPolicy, UnleverBasis, Weighting};
use crate::error::AppError;
use crate::io::ingest::{LoadReport, SchemaMapping, ingest_each};

/// Resolved options for a beta run. Built from CLI args by `app`.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Empty means every region.
    pub regions: Vec<Region>,
    pub periods: Vec<Period>,
    pub data_dir: Option<PathBuf>,
    pub ratio_unit: UnitPolicy,
    pub weighting: Weighting,
    pub target: Option<Target>,
    pub basis: UnleverBasis,
    pub exact: bool,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl RunConfig {
    pub fn regions(&self) -> Vec<Region> {
        if self.regions.is_empty() {
            Region::ALL.to_vec()
        } else {
            self.regions.clone()
        }
    }

    /// Every `(region, period)` pair to load, region-major.
    pub fn dataset_ids(&self) -> Vec<DatasetId> {
        self.regions()
            .into_iter()
            .flat_map(|region| self.periods.iter().map(move |&period| DatasetId::new(region, period)))
            .collect()
    }

    pub fn period_range(&self) -> Option<(Period, Period)> {
        let start = self.periods.iter().min()?;
        let end = self.periods.iter().max()?;
        Some((*start, *end))
    }

    pub fn schema(&self) -> SchemaMapping {
        SchemaMapping::default().with_ratio_unit(self.ratio_unit)
    }

    pub fn industry_match(&self, pattern: &str) -> IndustryMatch {
        if self.exact {
            IndustryMatch::Exact(pattern.to_string())
        } else {
            IndustryMatch::Contains(pattern.to_string())
        }
    }

    pub fn aggregate_query(&self, industry: Option<&str>) -> AggregateQuery {
        AggregateQuery {
            regions: self.regions.clone(),
            industry: industry.map(|p| self.industry_match(p)),
            periods: self.period_range(),
            weighting: self.weighting,
            target: self.target,
            basis: self.basis,
        }
    }

    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            regions: self.regions.clone(),
            periods: self.period_range(),
            weighting: self.weighting,
            target: self.target,
            basis: self.basis,
            exact: self.exact,
        }
    }
}

/// Load every configured data set from the web, or from `data_dir` when set.
pub fn load_datasets(config: &RunConfig) -> Result<LoadReport, AppError> {
    match &config.data_dir {
        Some(dir) => load_from(&LocalSource::new(dir), config),
        None => {
            let client = DamodaranClient::from_env()?;
            load_from(&client, config)
        }
    }
}

/// Fetch and ingest from any source; progress, warnings and the load summary go to stderr.
pub fn load_from<S: BetaSource + ?Sized>(source: &S, config: &RunConfig) -> Result<LoadReport, AppError> {
    load_with_log(source, config, &mut std::io::stderr().lock())
}

/// Same as `load_from`, writing the load log to `log`.
pub fn load_with_log<S, W>(source: &S, config: &RunConfig, log: &mut W) -> Result<LoadReport, AppError>
where
    S: BetaSource + ?Sized,
    W: Write,
{
    let ids = config.dataset_ids();
    if ids.is_empty() {
        return Err(AppError::new(2, "No data sets selected (check --from/--to/--current)."));
    }
    write_log(log, &format!("Loading {} data set(s)...\n", ids.len()))?;

    let fetched = fetch_all(source, &ids);
    let report = ingest_each(fetched, &config.schema(), |id| source.describe(id));

    for line in crate::report::format_load_warnings(&report) {
        write_log(log, &format!("[warn] {line}\n"))?;
    }

    let report = report.ensure_loaded()?;
    write_log(log, &crate::report::format_load_summary(&report))?;
    Ok(report)
}

fn write_log<W: Write>(log: &mut W, text: &str) -> Result<(), AppError> {
    log.write_all(text.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write load log: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_grid_is_region_major() {
        let config = RunConfig {
            regions: vec![Region::US, Region::Europe],
            periods: vec![Period::Year(2023), Period::Current],
            ..RunConfig::default()
        };
        let ids = config.dataset_ids();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], DatasetId::new(Region::US, Period::Year(2023)));
        assert_eq!(ids[1], DatasetId::new(Region::US, Period::Current));
        assert_eq!(ids[2].region, Region::Europe);
        assert_eq!(config.period_range(), Some((Period::Year(2023), Period::Current)));
    }

    #[test]
    fn empty_region_list_means_all() {
        let config = RunConfig {
            periods: vec![Period::Current],
            ..RunConfig::default()
        };
        assert_eq!(config.dataset_ids().len(), Region::ALL.len());
    }

    #[test]
    fn empty_grid_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::default();
        let err = load_from(&LocalSource::new(dir.path()), &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_log_ends_with_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("betas.csv"),
            "Industry Name,Number of firms,Beta\nBanking,7,0.74\n",
        )
        .unwrap();
        let config = RunConfig {
            regions: vec![Region::US, Region::Japan],
            periods: vec![Period::Current],
            ..RunConfig::default()
        };

        let mut log = Vec::new();
        let report = load_with_log(&LocalSource::new(dir.path()), &config, &mut log).unwrap();
        assert_eq!(report.loaded.len(), 1);

        let log = String::from_utf8(log).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "Loading 2 data set(s)...");
        assert!(lines[1].starts_with("[warn] "));
        assert_eq!(lines[2], "Data sets: loaded=1 failed=1 | records=1");
    }

    #[test]
    fn nothing_loaded_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            regions: vec![Region::Japan],
            periods: vec![Period::Current],
            ..RunConfig::default()
        };
        let err = load_from(&LocalSource::new(dir.path()), &config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
