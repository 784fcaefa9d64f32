//! Error types for data sources.

use thiserror::Error;

/// Result type for data-source operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while fetching or decoding a remote/local data set.
#[derive(Debug, Error)]
pub enum DataError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Workbook could not be opened or has no sheet.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload decoded but its content is not what was expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// No file/resource exists for the requested data set.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<calamine::Error> for DataError {
    fn from(err: calamine::Error) -> Self {
        Self::Spreadsheet(err.to_string())
    }
}
