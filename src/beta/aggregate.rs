//! Grouping and averaging of beta observations.
//!
//! Records are filtered by region, industry and period, grouped by
//! `(region, industry)` and reduced to one `AggregateResult` per group. All
//! periods of a group are pooled into one mean; no period is privileged.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::beta::error::{BetaError, Result};
use crate::beta::relever::{Target, relever};
use crate::domain::{BetaRecord, BetaRecordSet, Period, Region, UnleverBasis, Weighting, mean_present};

/// Case-insensitive industry name filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndustryMatch {
    Exact(String),
    Contains(String),
}

impl IndustryMatch {
    pub fn matches(&self, industry: &str) -> bool {
        let industry = industry.trim().to_lowercase();
        match self {
            IndustryMatch::Exact(name) => industry == name.trim().to_lowercase(),
            IndustryMatch::Contains(fragment) => industry.contains(&fragment.trim().to_lowercase()),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            IndustryMatch::Exact(s) | IndustryMatch::Contains(s) => s,
        }
    }
}

/// Filters and options for one aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregateQuery {
    /// Regions to keep; empty keeps every region.
    pub regions: Vec<Region>,
    /// Industry filter; `None` keeps every industry.
    pub industry: Option<IndustryMatch>,
    /// Inclusive period range.
    pub periods: Option<(Period, Period)>,
    pub weighting: Weighting,
    /// When set, betas are re-levered to this capital structure before averaging.
    pub target: Option<Target>,
    pub basis: UnleverBasis,
}

impl AggregateQuery {
    pub fn for_industry(industry: IndustryMatch) -> Self {
        Self {
            industry: Some(industry),
            ..Self::default()
        }
    }

    pub fn accepts(&self, record: &BetaRecord) -> bool {
        if !self.regions.is_empty() && !self.regions.contains(&record.region) {
            return false;
        }
        if let Some((from, to)) = self.periods {
            if record.period < from || record.period > to {
                return false;
            }
        }
        match &self.industry {
            Some(m) => m.matches(&record.industry),
            None => true,
        }
    }

    /// Short description used in error messages and report headers.
    pub fn describe(&self) -> String {
        let industry = match &self.industry {
            Some(IndustryMatch::Exact(name)) => format!("industry = '{name}'"),
            Some(IndustryMatch::Contains(fragment)) => format!("industry ~ '{fragment}'"),
            None => "any industry".to_string(),
        };
        if self.regions.is_empty() {
            return format!("{industry} in any region");
        }
        let regions: Vec<&str> = self.regions.iter().map(|r| r.label()).collect();
        format!("{industry} in {}", regions.join(", "))
    }

    fn validate(&self) -> Result<()> {
        if let Some(target) = &self.target {
            target.validate()?;
        }
        if let Some((from, to)) = self.periods {
            if from > to {
                return Err(BetaError::ReversedPeriods { from, to });
            }
        }
        Ok(())
    }
}

/// Averages of the capital structure a group was re-levered to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetBeta {
    pub levered_beta: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub tax_rate: Option<f64>,
}

/// One aggregated `(region, industry)` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub region: Region,
    pub industry: String,
    /// Mean of the observed betas, or of the re-levered ones when a target was given.
    pub average_levered_beta: Option<f64>,
    /// Mean of the observed levered betas regardless of any target.
    pub observed_levered_beta: Option<f64>,
    pub period_range: (Period, Period),
    /// Periods that contributed a value to the average.
    pub observation_count: usize,
    pub average_firm_count: Option<f64>,
    /// Firm count of the latest period carrying one.
    pub latest_firm_count: Option<u32>,
    pub target: Option<TargetBeta>,
}

impl AggregateResult {
    /// The group average, or `UndefinedAggregate` when every value was missing.
    pub fn average(&self) -> Result<f64> {
        self.average_levered_beta.ok_or_else(|| BetaError::UndefinedAggregate {
            region: self.region,
            industry: self.industry.clone(),
        })
    }
}

/// A value contributing to an average, with its firm-count weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub value: f64,
    pub firms: Option<u32>,
}

/// Simple or firm-count-weighted mean.
///
/// Missing firm counts weigh 0; a zero total weight falls back to the simple mean.
pub fn weighted_average(contributions: &[Contribution], weighting: Weighting) -> Option<f64> {
    if contributions.is_empty() {
        return None;
    }
    let simple = || contributions.iter().map(|c| c.value).sum::<f64>() / contributions.len() as f64;

    match weighting {
        Weighting::Simple => Some(simple()),
        Weighting::FirmCount => {
            let total: f64 = contributions
                .iter()
                .map(|c| f64::from(c.firms.unwrap_or(0)))
                .sum();
            if total <= 0.0 {
                return Some(simple());
            }
            let weighted: f64 = contributions
                .iter()
                .map(|c| c.value * f64::from(c.firms.unwrap_or(0)))
                .sum();
            Some(weighted / total)
        }
    }
}

/// Group matching records by `(region, industry)` and average each group.
///
/// An empty vector means nothing matched; it is a valid result, not an error.
pub fn aggregate(records: &BetaRecordSet, query: &AggregateQuery) -> Result<Vec<AggregateResult>> {
    query.validate()?;

    let mut groups: BTreeMap<(Region, &str), Vec<&BetaRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| query.accepts(r)) {
        groups
            .entry((record.region, record.industry.as_str()))
            .or_default()
            .push(record);
    }

    Ok(groups
        .into_iter()
        .map(|((region, industry), group)| summarize_group(region, industry, &group, query))
        .collect())
}

/// Like `aggregate`, but an empty result is reported as `EmptyResult`.
pub fn require_matches(records: &BetaRecordSet, query: &AggregateQuery) -> Result<Vec<AggregateResult>> {
    let rows = aggregate(records, query)?;
    if rows.is_empty() {
        return Err(BetaError::EmptyResult {
            query: query.describe(),
        });
    }
    Ok(rows)
}

/// Sorted, de-duplicated industry names, optionally for one region.
pub fn available_industries(records: &BetaRecordSet, region: Option<Region>) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .filter(|r| region.is_none_or(|wanted| r.region == wanted))
        .map(|r| r.industry.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

fn summarize_group(region: Region, industry: &str, group: &[&BetaRecord], query: &AggregateQuery) -> AggregateResult {
    let mut contributions = Vec::with_capacity(group.len());
    let mut used_de = Vec::new();
    let mut used_tax = Vec::new();

    for record in group {
        match &query.target {
            Some(target) => {
                if let Some(out) = relever(record, target, query.basis) {
                    contributions.push(Contribution {
                        value: out.levered_beta,
                        firms: record.firm_count,
                    });
                    used_de.push(Some(out.debt_to_equity));
                    used_tax.push(Some(out.tax_rate));
                }
            }
            None => {
                if let Some(beta) = record.levered_beta.filter(|b| b.is_finite()) {
                    contributions.push(Contribution {
                        value: beta,
                        firms: record.firm_count,
                    });
                }
            }
        }
    }

    let average_levered_beta = weighted_average(&contributions, query.weighting);

    let observed: Vec<Contribution> = group
        .iter()
        .filter_map(|r| {
            r.levered_beta.filter(|b| b.is_finite()).map(|value| Contribution {
                value,
                firms: r.firm_count,
            })
        })
        .collect();

    // Groups come from a BetaRecordSet iterated in key order, so periods ascend.
    let first = group.first().map(|r| r.period).unwrap_or(Period::Current);
    let last = group.last().map(|r| r.period).unwrap_or(first);

    AggregateResult {
        region,
        industry: industry.to_string(),
        average_levered_beta,
        observed_levered_beta: weighted_average(&observed, query.weighting),
        period_range: (first, last),
        observation_count: contributions.len(),
        average_firm_count: mean_present(group.iter().map(|r| r.firm_count.map(f64::from))),
        latest_firm_count: group.iter().rev().find_map(|r| r.firm_count),
        target: query.target.map(|_| TargetBeta {
            levered_beta: average_levered_beta,
            debt_to_equity: mean_present(used_de),
            tax_rate: mean_present(used_tax),
        }),
    }
}
