//! "Weakest link" weighted rating.
//!
//! Each rating gets `wᵢ = (1/n)(1 + ln(1 + rᵢ / max r))`; weights are then
//! normalized, so riskier (higher) ratings pull the average up.

use serde::Serialize;

use crate::metrics::MetricsError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedRating {
    pub ratings: Vec<f64>,
    pub weights: Vec<f64>,
    pub average: f64,
}

pub fn rating_weights(ratings: &[f64]) -> Result<Vec<f64>, MetricsError> {
    if ratings.is_empty() {
        return Err(MetricsError::Empty("no ratings given".into()));
    }
    if let Some(bad) = ratings.iter().find(|r| !r.is_finite() || **r < 0.0) {
        return Err(MetricsError::InvalidValue(format!(
            "rating {bad} must be finite and non-negative"
        )));
    }
    let max = ratings.iter().copied().fold(f64::MIN, f64::max);
    if max <= 0.0 {
        return Err(MetricsError::InvalidValue(
            "at least one rating must be positive".into(),
        ));
    }

    let n = ratings.len() as f64;
    let raw: Vec<f64> = ratings
        .iter()
        .map(|r| (1.0 / n) * (1.0 + (r / max).ln_1p()))
        .collect();
    let total: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|w| w / total).collect())
}

pub fn weighted_rating(ratings: &[f64]) -> Result<WeightedRating, MetricsError> {
    let weights = rating_weights(ratings)?;
    let average: f64 = ratings.iter().zip(&weights).map(|(r, w)| r * w).sum();
    Ok(WeightedRating {
        ratings: ratings.to_vec(),
        weights,
        average,
    })
}
