//! Error types for movement analysis
//!
//! Provides a unified error type for all movetrack crates.

use thiserror::Error;

/// Core error type for movement analysis operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Unsupported or ambiguous configuration (e.g. projection metadata)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Numerical optimisation stopped without meeting its tolerance
    #[error("Optimisation did not converge after {iterations} iterations (log-likelihood {log_likelihood:.4})")]
    NonConvergence { log_likelihood: f64, iterations: usize },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Timestamp could not be parsed
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for empty input
    pub fn empty_input(_operation: &str) -> Self {
        Self::InsufficientData {
            expected: 1,
            actual: 0,
        }
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }

    /// Create an error for a parameter that must be strictly positive
    pub fn not_positive(name: &str, value: f64) -> Self {
        Self::InvalidParameter(format!("{name} must be positive, got {value}"))
    }
}
