//! Cross-sector comparison.
//!
//! Each requested sector is aggregated independently with the same options,
//! then reduced to one summary row. Sectors that match nothing are listed in
//! `SectorComparison::not_found` rather than dropped.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::beta::aggregate::{AggregateQuery, IndustryMatch, aggregate};
use crate::beta::analysis::{analyze_sector, pooled_average};
use crate::beta::error::Result;
use crate::beta::relever::Target;
use crate::domain::{BetaRecordSet, Period, Region, UnleverBasis, Weighting};

/// Options shared by every sector of a comparison.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub regions: Vec<Region>,
    pub periods: Option<(Period, Period)>,
    pub weighting: Weighting,
    pub target: Option<Target>,
    pub basis: UnleverBasis,
    /// Match sector names exactly instead of by substring.
    pub exact: bool,
}

impl CompareOptions {
    fn query_for(&self, sector: &str) -> AggregateQuery {
        let industry = if self.exact {
            IndustryMatch::Exact(sector.to_string())
        } else {
            IndustryMatch::Contains(sector.to_string())
        };
        AggregateQuery {
            regions: self.regions.clone(),
            industry: Some(industry),
            periods: self.periods,
            weighting: self.weighting,
            target: self.target,
            basis: self.basis,
        }
    }
}

/// Summary of one requested sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub sector: String,
    pub average_levered_beta: Option<f64>,
    /// Distinct regions with at least one contributing value.
    pub region_count: usize,
    /// Sum over matched groups of each group's latest firm count.
    pub total_firms: u64,
    /// Matched `(region, industry)` groups.
    pub match_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorComparison {
    /// Sorted by beta, highest first; sectors without a beta come last.
    pub rows: Vec<ComparisonRow>,
    /// Requested sectors that matched no observation, in request order.
    pub not_found: Vec<String>,
}

pub fn compare_sectors(
    records: &BetaRecordSet,
    sectors: &[String],
    options: &CompareOptions,
) -> Result<SectorComparison> {
    let mut comparison = SectorComparison::default();

    for sector in sectors {
        let query = options.query_for(sector);
        let groups = aggregate(records, &query)?;
        if groups.is_empty() {
            comparison.not_found.push(sector.clone());
            continue;
        }

        let observations = analyze_sector(records, &query)?;
        let regions: BTreeSet<Region> = groups
            .iter()
            .filter(|g| g.observation_count > 0)
            .map(|g| g.region)
            .collect();

        comparison.rows.push(ComparisonRow {
            sector: sector.clone(),
            average_levered_beta: pooled_average(&observations, options.weighting),
            region_count: regions.len(),
            total_firms: groups
                .iter()
                .filter_map(|g| g.latest_firm_count)
                .map(u64::from)
                .sum(),
            match_count: groups.len(),
        });
    }

    comparison.rows.sort_by(|a, b| {
        match (a.average_levered_beta, b.average_levered_beta) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.sector.cmp(&b.sector))
    });

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BetaRecord;

    fn obs(region: Region, industry: &str, year: i32, beta: Option<f64>, firms: u32) -> BetaRecord {
        BetaRecord {
            levered_beta: beta,
            firm_count: Some(firms),
            ..BetaRecord::new(region, industry, Period::Year(year))
        }
    }

    fn records() -> BetaRecordSet {
        BetaRecordSet::from_records([
            obs(Region::US, "Banking (Regional)", 2023, Some(0.5), 600),
            obs(Region::US, "Banking (Regional)", 2024, Some(0.6), 650),
            obs(Region::Europe, "Bank (Money Center)", 2024, Some(0.9), 40),
            obs(Region::US, "Software (System & Application)", 2024, Some(1.3), 350),
            obs(Region::Europe, "Utility (General)", 2024, None, 20),
        ])
    }

    fn sectors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_sorted_by_descending_beta() {
        let cmp = compare_sectors(&records(), &sectors(&["bank", "software"]), &CompareOptions::default()).unwrap();
        let names: Vec<&str> = cmp.rows.iter().map(|r| r.sector.as_str()).collect();
        assert_eq!(names, vec!["software", "bank"]);

        let bank = &cmp.rows[1];
        assert!((bank.average_levered_beta.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(bank.region_count, 2);
        assert_eq!(bank.match_count, 2);
        assert_eq!(bank.total_firms, 650 + 40);
    }

    #[test]
    fn zero_match_sectors_are_reported_not_dropped() {
        let cmp = compare_sectors(
            &records(),
            &sectors(&["Tobacco", "bank", "Shipping"]),
            &CompareOptions::default(),
        )
        .unwrap();
        assert_eq!(cmp.rows.len(), 1);
        assert_eq!(cmp.not_found, vec!["Tobacco".to_string(), "Shipping".to_string()]);
    }

    #[test]
    fn missing_beta_rows_sort_last() {
        let cmp = compare_sectors(&records(), &sectors(&["utility", "bank"]), &CompareOptions::default()).unwrap();
        assert_eq!(cmp.rows[0].sector, "bank");
        assert_eq!(cmp.rows[1].average_levered_beta, None);
        assert_eq!(cmp.rows[1].region_count, 0);
    }

    #[test]
    fn exact_matching_is_opt_in() {
        let options = CompareOptions {
            exact: true,
            ..CompareOptions::default()
        };
        let cmp = compare_sectors(&records(), &sectors(&["bank"]), &options).unwrap();
        assert!(cmp.rows.is_empty());
        assert_eq!(cmp.not_found, vec!["bank".to_string()]);
    }
}
