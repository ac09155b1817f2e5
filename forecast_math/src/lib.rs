//! # Forecast Math
//!
//! Numeric kernels used by the sell-in forecasting models.
//! This crate provides differencing polynomials, a bounded Nelder-Mead
//! optimiser, stationarity tests and a few summary statistics.

use thiserror::Error;

pub mod differencing;
pub mod optimization;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in forecasting-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_problem() {
        let err = MathError::InsufficientData("need 4 values".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 4 values"
        );
    }
}
