//! Hamada re-levering.
//!
//! `βL = βU × (1 + (1 − T) × D/E)`
//!
//! All functions are pure; missing inputs propagate as `None`.

use crate::beta::error::{BetaError, Result};
use crate::domain::{BetaRecord, UnleverBasis};

/// A target capital structure.
///
/// Each field overrides the record's own value when set; an unset field keeps
/// the record's original.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Target {
    pub debt_to_equity: Option<f64>,
    pub tax_rate: Option<f64>,
}

impl Target {
    pub fn new(debt_to_equity: f64, tax_rate: f64) -> Self {
        Self {
            debt_to_equity: Some(debt_to_equity),
            tax_rate: Some(tax_rate),
        }
    }

    /// `true` when neither field overrides anything.
    pub fn is_identity(&self) -> bool {
        self.debt_to_equity.is_none() && self.tax_rate.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(de) = self.debt_to_equity {
            if !de.is_finite() || de < 0.0 {
                return Err(BetaError::InvalidTarget(format!(
                    "debt/equity must be finite and >= 0 (got {de})"
                )));
            }
        }
        if let Some(tax) = self.tax_rate {
            if !tax.is_finite() || !(0.0..=1.0).contains(&tax) {
                return Err(BetaError::InvalidTarget(format!(
                    "tax rate must be within [0, 1] (got {tax})"
                )));
            }
        }
        Ok(())
    }
}

/// The debt/equity ratio and tax rate a re-levering actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relevered {
    pub levered_beta: f64,
    pub debt_to_equity: f64,
    pub tax_rate: f64,
}

/// Lever an unlevered beta.
pub fn hamada_lever(unlevered_beta: f64, debt_to_equity: f64, tax_rate: f64) -> f64 {
    unlevered_beta * (1.0 + (1.0 - tax_rate) * debt_to_equity)
}

/// Remove leverage from a levered beta; `None` when the leverage factor is zero.
pub fn hamada_unlever(levered_beta: f64, debt_to_equity: f64, tax_rate: f64) -> Option<f64> {
    let factor = 1.0 + (1.0 - tax_rate) * debt_to_equity;
    if !factor.is_finite() || factor.abs() < f64::EPSILON {
        return None;
    }
    let unlevered = levered_beta / factor;
    unlevered.is_finite().then_some(unlevered)
}

/// Unlevered beta selected by `basis`, falling back to the plain one.
pub fn unlevered_input(record: &BetaRecord, basis: UnleverBasis) -> Option<f64> {
    match basis {
        UnleverBasis::Unlevered => record.unlevered_beta,
        UnleverBasis::CashAdjusted => record.cash_adjusted_unlevered_beta.or(record.unlevered_beta),
    }
}

/// Re-lever a record toward `target`.
pub fn relever(record: &BetaRecord, target: &Target, basis: UnleverBasis) -> Option<Relevered> {
    let unlevered = unlevered_input(record, basis)?;
    let debt_to_equity = target
        .debt_to_equity
        .or_else(|| record.debt_to_equity.map(|r| r.value()))?;
    let tax_rate = target.tax_rate.or_else(|| record.tax_rate.map(|r| r.value()))?;

    let levered_beta = hamada_lever(unlevered, debt_to_equity, tax_rate);
    levered_beta.is_finite().then_some(Relevered {
        levered_beta,
        debt_to_equity,
        tax_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Period, Ratio, Region};

    fn record() -> BetaRecord {
        let mut r = BetaRecord::new(Region::Europe, "Utility (General)", Period::Year(2024));
        r.levered_beta = Some(0.62);
        r.debt_to_equity = Some(Ratio::fraction(0.8));
        r.tax_rate = Some(Ratio::fraction(0.2));
        r.unlevered_beta = hamada_unlever(0.62, 0.8, 0.2);
        r
    }

    #[test]
    fn levers_known_scenario() {
        let beta = hamada_lever(0.8, 0.5, 0.25);
        assert!((beta - 1.1).abs() < 1e-12);
    }

    #[test]
    fn zero_debt_returns_unlevered_beta() {
        assert!((hamada_lever(0.93, 0.0, 0.3) - 0.93).abs() < 1e-12);
    }

    #[test]
    fn identity_target_reproduces_levered_beta() {
        let r = record();
        let out = relever(&r, &Target::default(), UnleverBasis::Unlevered).unwrap();
        assert!((out.levered_beta - 0.62).abs() < 1e-9);
        assert!((out.debt_to_equity - 0.8).abs() < 1e-12);
    }

    #[test]
    fn target_overrides_each_field_independently() {
        let r = record();
        let target = Target {
            debt_to_equity: Some(0.0),
            tax_rate: None,
        };
        let out = relever(&r, &target, UnleverBasis::Unlevered).unwrap();
        assert!((out.levered_beta - r.unlevered_beta.unwrap()).abs() < 1e-12);
        assert!((out.tax_rate - 0.2).abs() < 1e-12);
    }

    #[test]
    fn missing_unlevered_beta_propagates() {
        let mut r = record();
        r.unlevered_beta = None;
        assert!(relever(&r, &Target::new(0.5, 0.25), UnleverBasis::Unlevered).is_none());
    }

    #[test]
    fn cash_adjusted_basis_falls_back_to_plain() {
        let mut r = record();
        r.unlevered_beta = Some(0.5);
        let plain = relever(&r, &Target::new(1.0, 0.0), UnleverBasis::CashAdjusted).unwrap();
        assert!((plain.levered_beta - 1.0).abs() < 1e-12);

        r.cash_adjusted_unlevered_beta = Some(0.6);
        let adjusted = relever(&r, &Target::new(1.0, 0.0), UnleverBasis::CashAdjusted).unwrap();
        assert!((adjusted.levered_beta - 1.2).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_out_of_range_targets() {
        assert!(Target::new(0.5, 0.25).validate().is_ok());
        assert!(Target::new(-0.1, 0.25).validate().is_err());
        assert!(Target::new(0.5, 1.5).validate().is_err());
        let nan = Target {
            debt_to_equity: Some(f64::NAN),
            tax_rate: None,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn unlever_rejects_zero_factor() {
        // 1 + (1 - 2) * 1 = 0
        assert!(hamada_unlever(1.0, 1.0, 2.0).is_none());
    }
}
