//! Binary-level error: a message plus the process exit code.
//!
//! Exit codes:
//! - `2`: usage, configuration or local input problems
//! - `3`: no data (nothing loaded, or a required result came back empty)
//! - `4`: external sources (HTTP, remote payloads)

use crate::beta::BetaError;
use crate::data::DataError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<BetaError> for AppError {
    fn from(err: BetaError) -> Self {
        let code = match err {
            BetaError::NoData | BetaError::EmptyResult { .. } | BetaError::UndefinedAggregate { .. } => 3,
            BetaError::Schema { .. } => 4,
            BetaError::InvalidTarget(_) | BetaError::ReversedPeriods { .. } => 2,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        let code = match err {
            DataError::Io(_) => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors_to_exit_codes() {
        assert_eq!(AppError::from(BetaError::NoData).exit_code(), 3);
        assert_eq!(AppError::from(BetaError::InvalidTarget("tax".into())).exit_code(), 2);
        assert_eq!(AppError::from(DataError::Parse("bad".into())).exit_code(), 4);
    }
}
