//! Error types for big-number arithmetic

use thiserror::Error;

/// Errors produced by fixed-point arithmetic and parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    /// The input is not a decimal literal of the form `[-+]?digits('.'digits)?`
    #[error("invalid decimal literal: {0:?}")]
    InvalidFormat(String),
    /// Division by a value whose scaled representation is zero
    #[error("division by zero")]
    DivisionByZero,
    /// NaN or infinity cannot be converted into a scaled integer
    #[error("non-finite value {0} cannot be converted to fixed point")]
    NonFinite(f64),
}
