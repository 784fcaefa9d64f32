//! Error taxonomy of the sector-beta core.

use thiserror::Error;

use crate::domain::{Period, Region};

/// Result type for the sector-beta core.
pub type Result<T> = std::result::Result<T, BetaError>;

/// Errors raised while ingesting or aggregating beta tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BetaError {
    /// A required column is absent from a data set.
    #[error("{dataset}: missing required column `{column}`")]
    Schema { dataset: DatasetId, column: String },

    /// A filter matched no observation.
    #[error("no observation matched {query}")]
    EmptyResult { query: String },

    /// Every contributing value of a group is missing.
    #[error("average beta undefined for {region} / {industry}: every contributing value is missing")]
    UndefinedAggregate { region: Region, industry: String },

    /// A target capital structure outside its domain.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A period range whose start is after its end.
    #[error("period range is reversed ({from} > {to})")]
    ReversedPeriods { from: Period, to: Period },

    /// No data set could be loaded at all.
    #[error("no data set could be loaded; check regions and periods")]
    NoData,
}

/// The `(region, period)` coordinates of one data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId {
    pub region: Region,
    pub period: Period,
}

impl DatasetId {
    pub fn new(region: Region, period: Period) -> Self {
        Self { region, period }
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.region, self.period)
    }
}
