//! Error types for the negotiation engine.

use thiserror::Error;

/// Errors raised by the negotiation engine.
///
/// Configuration and input errors are detected before any optimizer runs.
/// Numeric degeneracy is only raised by the Pareto layer when no sane
/// default exists.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// A bound, denominator or algorithm parameter is unusable.
    #[error("configuration error in '{field}': {message}")]
    Configuration {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A request payload is missing fields or carries malformed values.
    #[error("invalid input in '{field}': {message}")]
    InputValidation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A Pareto computation has no meaningful result.
    #[error("numeric degeneracy: {message}")]
    NumericDegeneracy {
        /// Description of the degenerate case.
        message: String,
    },

    /// Reading a request or config file, or writing output, failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload is not valid JSON or does not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NegotiationError {
    /// Build a `Configuration` error for `field`.
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        NegotiationError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an `InputValidation` error for `field`.
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        NegotiationError::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a `NumericDegeneracy` error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        NegotiationError::NumericDegeneracy {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NegotiationError>;
