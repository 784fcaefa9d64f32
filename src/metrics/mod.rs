//! Closed-form metrics outside the beta core.
//!
//! - annualized FX volatility from daily log returns (`volatility`)
//! - Herfindahl-Hirschman concentration of a PE portfolio (`concentration`)
//! - log-amplified weighted risk rating (`rating`)

use thiserror::Error;

pub mod concentration;
pub mod rating;
pub mod volatility;

/// Errors raised by the metric computations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("insufficient observations: {available} returns for a window of {needed}")]
    InsufficientData { needed: usize, available: usize },

    #[error("window must be at least 2 returns (got {0})")]
    InvalidWindow(usize),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("empty input: {0}")]
    Empty(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<MetricsError> for crate::error::AppError {
    fn from(err: MetricsError) -> Self {
        let code = match err {
            MetricsError::InsufficientData { .. } => 3,
            _ => 2,
        };
        crate::error::AppError::new(code, err.to_string())
    }
}
