//! Per-observation sector analysis.

use serde::Serialize;

use crate::beta::aggregate::{AggregateQuery, Contribution, weighted_average};
use crate::beta::error::Result;
use crate::beta::relever::relever;
use crate::domain::{BetaRecordSet, Period, Region, Weighting};

/// One matching observation with its original and re-levered figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorObservation {
    pub industry: String,
    pub region: Region,
    pub period: Period,
    pub firm_count: Option<u32>,
    pub levered_beta: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub tax_rate: Option<f64>,
    pub unlevered_beta: Option<f64>,
    pub cash_adjusted_unlevered_beta: Option<f64>,
    pub target_levered_beta: Option<f64>,
    pub target_debt_to_equity: Option<f64>,
    pub target_tax_rate: Option<f64>,
}

/// Detail rows for every record accepted by `query`, in key order.
pub fn analyze_sector(records: &BetaRecordSet, query: &AggregateQuery) -> Result<Vec<SectorObservation>> {
    if let Some(target) = &query.target {
        target.validate()?;
    }

    Ok(records
        .iter()
        .filter(|r| query.accepts(r))
        .map(|record| {
            let relevered = query.target.as_ref().and_then(|t| relever(record, t, query.basis));
            SectorObservation {
                industry: record.industry.clone(),
                region: record.region,
                period: record.period,
                firm_count: record.firm_count,
                levered_beta: record.levered_beta,
                debt_to_equity: record.debt_to_equity.map(|r| r.value()),
                tax_rate: record.tax_rate.map(|r| r.value()),
                unlevered_beta: record.unlevered_beta,
                cash_adjusted_unlevered_beta: record.cash_adjusted_unlevered_beta,
                target_levered_beta: relevered.map(|r| r.levered_beta),
                target_debt_to_equity: relevered.map(|r| r.debt_to_equity),
                target_tax_rate: relevered.map(|r| r.tax_rate),
            }
        })
        .collect())
}

/// Average over detail rows.
///
/// Uses the re-levered betas when any row carries one, the original betas otherwise.
pub fn pooled_average(observations: &[SectorObservation], weighting: Weighting) -> Option<f64> {
    let use_target = observations.iter().any(|o| o.target_levered_beta.is_some());
    let contributions: Vec<Contribution> = observations
        .iter()
        .filter_map(|o| {
            let value = if use_target { o.target_levered_beta } else { o.levered_beta };
            value.filter(|v| v.is_finite()).map(|value| Contribution {
                value,
                firms: o.firm_count,
            })
        })
        .collect();
    weighted_average(&contributions, weighting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beta::aggregate::IndustryMatch;
    use crate::beta::relever::Target;
    use crate::domain::{BetaRecord, Ratio};

    fn records() -> BetaRecordSet {
        let mut us = BetaRecord::new(Region::US, "Banking (Regional)", Period::Current);
        us.levered_beta = Some(0.9);
        us.unlevered_beta = Some(0.5);
        us.firm_count = Some(10);
        us.debt_to_equity = Some(Ratio::fraction(1.0));
        us.tax_rate = Some(Ratio::fraction(0.2));

        let mut eu = BetaRecord::new(Region::Europe, "Bank (Money Center)", Period::Current);
        eu.levered_beta = Some(1.1);
        eu.firm_count = Some(30);

        BetaRecordSet::from_records([us, eu])
    }

    #[test]
    fn detail_rows_carry_target_figures_when_relevered() {
        let query = AggregateQuery {
            target: Some(Target::new(0.5, 0.25)),
            ..AggregateQuery::for_industry(IndustryMatch::Contains("bank".into()))
        };
        let rows = analyze_sector(&records(), &query).unwrap();
        assert_eq!(rows.len(), 2);

        let eu = &rows[0];
        assert_eq!(eu.region, Region::Europe);
        assert_eq!(eu.target_levered_beta, None);

        let us = &rows[1];
        let expected = 0.5 * (1.0 + 0.75 * 0.5);
        assert!((us.target_levered_beta.unwrap() - expected).abs() < 1e-12);
        assert_eq!(us.target_tax_rate, Some(0.25));
    }

    #[test]
    fn pooled_average_prefers_target_betas() {
        let query = AggregateQuery::for_industry(IndustryMatch::Contains("bank".into()));
        let rows = analyze_sector(&records(), &query).unwrap();
        let weighted = pooled_average(&rows, Weighting::FirmCount).unwrap();
        assert!((weighted - 1.05).abs() < 1e-12);

        let query = AggregateQuery {
            target: Some(Target::new(0.0, 0.0)),
            ..query
        };
        let rows = analyze_sector(&records(), &query).unwrap();
        assert_eq!(pooled_average(&rows, Weighting::Simple), Some(0.5));
    }
}
