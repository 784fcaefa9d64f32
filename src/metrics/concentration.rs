//! Herfindahl-Hirschman concentration of a private-equity portfolio.
//!
//! Shares are derived from one of several weighting bases (TVPI, value,
//! distributions, NAV, invested capital), then `HHI = Σ sᵢ²` and the
//! normalized `HHI* = (HHI − 1/N) / (1 − 1/N)` are computed.

use std::collections::HashMap;
use std::io::Read;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsError;

const TVPI: &str = "TVPI";
const PAID_IN: &str = "PaidIn";
const NAV: &str = "NAV";
const DISTRIBUTIONS: &str = "Distributions";
const INVESTED_ALIASES: [&str; 4] = ["Investito", "Invested", "Amount", "Importo"];

/// Basis used to turn each deal into a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareMode {
    /// TVPI multiple, read or computed as `(Distributions + NAV) / PaidIn`.
    Tvpi,
    /// `TVPI × PaidIn`, i.e. total value.
    #[default]
    Value,
    /// Distributions only.
    Realized,
    /// NAV only.
    Unrealized,
    /// Invested capital column.
    Invested,
}

impl ShareMode {
    pub fn label(self) -> &'static str {
        match self {
            ShareMode::Tvpi => "tvpi",
            ShareMode::Value => "value",
            ShareMode::Realized => "realized",
            ShareMode::Unrealized => "unrealized",
            ShareMode::Invested => "invested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConcentrationLevel {
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl ConcentrationLevel {
    pub fn label(self) -> &'static str {
        match self {
            ConcentrationLevel::Low => "low",
            ConcentrationLevel::MediumLow => "medium-low",
            ConcentrationLevel::Medium => "medium",
            ConcentrationLevel::MediumHigh => "medium-high",
            ConcentrationLevel::High => "high",
        }
    }
}

/// One deal as read from the portfolio CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deal {
    pub id: String,
    pub tvpi: Option<f64>,
    pub paid_in: Option<f64>,
    pub nav: Option<f64>,
    pub distributions: Option<f64>,
    pub invested: Option<f64>,
}

/// Deals plus which optional columns the source actually carried.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    pub deals: Vec<Deal>,
    pub has_tvpi: bool,
    pub has_paid_in: bool,
    pub has_nav: bool,
    pub has_distributions: bool,
    /// Header used for invested capital; only resolved in invested mode.
    pub invested_column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hhi {
    pub value: f64,
    /// Undefined for a single-deal portfolio.
    pub normalized: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub id: String,
    pub share: f64,
    pub share_squared: f64,
    pub tvpi: Option<f64>,
    pub paid_in: Option<f64>,
    pub nav: Option<f64>,
    pub distributions: Option<f64>,
    pub invested: Option<f64>,
    /// `NAV + Distributions`, value mode only.
    pub value_created: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationReport {
    pub mode: ShareMode,
    pub hhi: Hhi,
    pub level: Option<ConcentrationLevel>,
    /// Sorted by share, largest first.
    pub rows: Vec<ShareRow>,
}

impl Portfolio {
    /// Read a portfolio CSV with headers.
    ///
    /// The id comes from `id_column` when present. Otherwise the invested
    /// mode falls back to the first column and other modes number the rows.
    pub fn from_csv<R: Read>(reader: R, id_column: &str, mode: ShareMode) -> Result<Self, MetricsError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        // Other modes never read this column, so a text second column is fine there.
        let invested_column = if mode == ShareMode::Invested {
            INVESTED_ALIASES
                .iter()
                .find(|alias| index.contains_key(**alias))
                .map(|alias| alias.to_string())
                .or_else(|| headers.get(1).cloned())
        } else {
            None
        };

        let id_idx = index
            .get(id_column)
            .copied()
            .or_else(|| (mode == ShareMode::Invested && !headers.is_empty()).then_some(0));
        let invested_idx = invested_column.as_deref().and_then(|c| index.get(c).copied());

        let mut deals = Vec::new();
        for (i, row) in rdr.records().enumerate() {
            let row = row?;
            let line = i + 2;
            let cell = |col: Option<usize>| -> Result<Option<f64>, MetricsError> {
                match col.and_then(|c| row.get(c)).map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(raw) => raw
                        .replace(',', "")
                        .parse::<f64>()
                        .map(Some)
                        .map_err(|_| MetricsError::InvalidValue(format!("line {line}: '{raw}' is not numeric"))),
                }
            };

            let id = match id_idx.and_then(|c| row.get(c)) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => (i + 1).to_string(),
            };
            deals.push(Deal {
                id,
                tvpi: cell(index.get(TVPI).copied())?,
                paid_in: cell(index.get(PAID_IN).copied())?,
                nav: cell(index.get(NAV).copied())?,
                distributions: cell(index.get(DISTRIBUTIONS).copied())?,
                invested: cell(invested_idx)?,
            });
        }

        Ok(Self {
            deals,
            has_tvpi: index.contains_key(TVPI),
            has_paid_in: index.contains_key(PAID_IN),
            has_nav: index.contains_key(NAV),
            has_distributions: index.contains_key(DISTRIBUTIONS),
            invested_column,
        })
    }

    /// TVPI per deal: the TVPI column when complete, else `(D + NAV) / PaidIn`.
    pub fn tvpi(&self) -> Result<Vec<f64>, MetricsError> {
        if self.has_tvpi && self.deals.iter().all(|d| d.tvpi.is_some()) {
            return Ok(self.deals.iter().filter_map(|d| d.tvpi).collect());
        }
        if !self.has_paid_in || !self.has_nav {
            return Err(MetricsError::MissingColumn(format!(
                "{TVPI}, or {PAID_IN} and {NAV} to compute it"
            )));
        }

        self.deals
            .iter()
            .map(|d| {
                let paid_in = required(d.paid_in, PAID_IN, &d.id)?;
                if paid_in <= 0.0 {
                    return Err(MetricsError::InvalidValue(format!(
                        "deal {}: {PAID_IN} must be > 0",
                        d.id
                    )));
                }
                let nav = required(d.nav, NAV, &d.id)?;
                Ok((d.distributions.unwrap_or(0.0) + nav) / paid_in)
            })
            .collect()
    }

    /// Raw, un-normalized weight of every deal under `mode`.
    pub fn weights(&self, mode: ShareMode) -> Result<Vec<f64>, MetricsError> {
        match mode {
            ShareMode::Tvpi => self.tvpi(),
            ShareMode::Value => {
                if !self.has_paid_in {
                    return Err(MetricsError::MissingColumn(format!("{PAID_IN} (value mode)")));
                }
                let tvpi = self.tvpi()?;
                self.deals
                    .iter()
                    .zip(tvpi)
                    .map(|(d, t)| Ok(t * required(d.paid_in, PAID_IN, &d.id)?))
                    .collect()
            }
            ShareMode::Realized => {
                if !self.has_distributions {
                    return Err(MetricsError::MissingColumn(format!(
                        "{DISTRIBUTIONS} (realized mode)"
                    )));
                }
                Ok(self.deals.iter().map(|d| d.distributions.unwrap_or(0.0)).collect())
            }
            ShareMode::Unrealized => {
                if !self.has_nav {
                    return Err(MetricsError::MissingColumn(format!("{NAV} (unrealized mode)")));
                }
                self.deals
                    .iter()
                    .map(|d| required(d.nav, NAV, &d.id))
                    .collect()
            }
            ShareMode::Invested => {
                let column = self
                    .invested_column
                    .as_deref()
                    .ok_or_else(|| MetricsError::MissingColumn("invested capital".into()))?;
                self.deals
                    .iter()
                    .map(|d| {
                        let v = required(d.invested, column, &d.id)?;
                        if v < 0.0 {
                            return Err(MetricsError::InvalidValue(format!(
                                "deal {}: negative {column}",
                                d.id
                            )));
                        }
                        Ok(v)
                    })
                    .collect()
            }
        }
    }
}

fn required(value: Option<f64>, column: &str, id: &str) -> Result<f64, MetricsError> {
    value.ok_or_else(|| MetricsError::InvalidValue(format!("deal {id}: missing {column}")))
}

/// Normalize weights to shares summing to one.
pub fn shares(weights: &[f64]) -> Result<Vec<f64>, MetricsError> {
    if weights.is_empty() {
        return Err(MetricsError::Empty("no deals in portfolio".into()));
    }
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(MetricsError::InvalidValue(
            "sum of weights must be positive".into(),
        ));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

pub fn hhi(shares: &[f64]) -> Hhi {
    let value: f64 = shares.iter().map(|s| s * s).sum();
    let n = shares.len() as f64;
    let normalized = (shares.len() > 1).then(|| (value - 1.0 / n) / (1.0 - 1.0 / n));
    Hhi { value, normalized }
}

pub fn classify(normalized: f64) -> ConcentrationLevel {
    if normalized < 0.2 {
        ConcentrationLevel::Low
    } else if normalized < 0.4 {
        ConcentrationLevel::MediumLow
    } else if normalized < 0.6 {
        ConcentrationLevel::Medium
    } else if normalized < 0.8 {
        ConcentrationLevel::MediumHigh
    } else {
        ConcentrationLevel::High
    }
}

pub fn concentration(portfolio: &Portfolio, mode: ShareMode) -> Result<ConcentrationReport, MetricsError> {
    let weights = portfolio.weights(mode)?;
    let shares = shares(&weights)?;
    let hhi = hhi(&shares);

    // TVPI is informative in every mode; skip it silently when it can't be derived.
    let tvpi = portfolio.tvpi().ok();
    let value_mode = mode == ShareMode::Value;

    let mut rows: Vec<ShareRow> = portfolio
        .deals
        .iter()
        .zip(&shares)
        .enumerate()
        .map(|(i, (deal, &share))| {
            let tvpi = tvpi.as_ref().and_then(|t| t.get(i).copied());
            ShareRow {
                id: deal.id.clone(),
                share,
                share_squared: share * share,
                tvpi,
                paid_in: deal.paid_in,
                nav: deal.nav,
                distributions: deal.distributions,
                invested: deal.invested,
                value_created: value_mode
                    .then(|| deal.nav.map(|nav| nav + deal.distributions.unwrap_or(0.0)))
                    .flatten(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.share.total_cmp(&a.share));

    Ok(ConcentrationReport {
        mode,
        hhi,
        level: hhi.normalized.map(classify),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio(csv: &str, mode: ShareMode) -> Portfolio {
        Portfolio::from_csv(csv.as_bytes(), "Deal", mode).unwrap()
    }

    #[test]
    fn equal_shares_have_zero_normalized_hhi() {
        let h = hhi(&[0.25, 0.25, 0.25, 0.25]);
        assert!((h.value - 0.25).abs() < 1e-12);
        assert!(h.normalized.unwrap().abs() < 1e-12);
        assert_eq!(classify(h.normalized.unwrap()), ConcentrationLevel::Low);
    }

    #[test]
    fn single_deal_has_no_normalized_index() {
        let h = hhi(&[1.0]);
        assert_eq!(h.value, 1.0);
        assert!(h.normalized.is_none());
    }

    #[test]
    fn classification_bands() {
        assert_eq!(classify(0.1), ConcentrationLevel::Low);
        assert_eq!(classify(0.2), ConcentrationLevel::MediumLow);
        assert_eq!(classify(0.5), ConcentrationLevel::Medium);
        assert_eq!(classify(0.79), ConcentrationLevel::MediumHigh);
        assert_eq!(classify(0.95), ConcentrationLevel::High);
    }

    #[test]
    fn computes_tvpi_when_column_missing() {
        let p = portfolio(
            "Deal,PaidIn,NAV,Distributions\nA,100,150,50\nB,100,50,0\n",
            ShareMode::Tvpi,
        );
        let tvpi = p.tvpi().unwrap();
        assert_eq!(tvpi, vec![2.0, 0.5]);

        let report = concentration(&p, ShareMode::Tvpi).unwrap();
        assert_eq!(report.rows[0].id, "A");
        assert!((report.rows[0].share - 0.8).abs() < 1e-12);
        assert_eq!(report.rows[0].value_created, None);
    }

    #[test]
    fn value_mode_weights_by_total_value() {
        let p = portfolio("Deal,TVPI,PaidIn\nA,2.0,100\nB,1.0,300\n", ShareMode::Value);
        assert_eq!(p.weights(ShareMode::Value).unwrap(), vec![200.0, 300.0]);
    }

    #[test]
    fn value_created_is_nav_plus_distributions() {
        let p = portfolio(
            "Deal,PaidIn,NAV,Distributions\nA,100,150,50\nB,100,50,\n",
            ShareMode::Value,
        );
        let report = concentration(&p, ShareMode::Value).unwrap();
        assert_eq!(report.rows[0].id, "A");
        assert_eq!(report.rows[0].value_created, Some(200.0));
        assert_eq!(report.rows[1].value_created, Some(50.0));
    }

    #[test]
    fn text_second_column_is_ignored_outside_invested_mode() {
        let csv = "Deal,Manager,PaidIn,NAV,Distributions\nA,Acme Partners,100,150,50\nB,Beacon Capital,100,50,0\n";
        for mode in [ShareMode::Tvpi, ShareMode::Value, ShareMode::Realized, ShareMode::Unrealized] {
            let p = portfolio(csv, mode);
            assert_eq!(p.invested_column, None);
            assert!(p.deals.iter().all(|d| d.invested.is_none()));
            assert!(concentration(&p, mode).is_ok());
        }

        let err = Portfolio::from_csv(csv.as_bytes(), "Deal", ShareMode::Invested).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidValue(_)));
    }

    #[test]
    fn invested_mode_uses_first_column_as_id() {
        let p = portfolio("Name,Investito\nAlpha,10\nBeta,30\n", ShareMode::Invested);
        assert_eq!(p.invested_column.as_deref(), Some("Investito"));
        let report = concentration(&p, ShareMode::Invested).unwrap();
        assert_eq!(report.rows[0].id, "Beta");
        assert!((report.rows[0].share - 0.75).abs() < 1e-12);
    }

    #[test]
    fn rows_are_numbered_without_an_id_column() {
        let p = portfolio("NAV\n5\n5\n", ShareMode::Unrealized);
        assert_eq!(p.deals[0].id, "1");
        assert_eq!(p.deals[1].id, "2");
    }

    #[test]
    fn rejects_bad_portfolios() {
        let p = portfolio("Deal,PaidIn,NAV\nA,0,10\n", ShareMode::Tvpi);
        assert!(matches!(p.tvpi(), Err(MetricsError::InvalidValue(_))));

        let p = portfolio("Deal,NAV\nA,10\n", ShareMode::Realized);
        assert!(matches!(
            p.weights(ShareMode::Realized),
            Err(MetricsError::MissingColumn(_))
        ));

        assert!(matches!(shares(&[0.0, 0.0]), Err(MetricsError::InvalidValue(_))));
        assert!(matches!(shares(&[]), Err(MetricsError::Empty(_))));
    }
}
