//! Unified error types for the receipt splitter.
//!
//! Store operations, configuration loading and the extraction boundary all
//! report failures through [`Error`]. The cost allocator itself never fails.

use thiserror::Error;

/// Every error the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// No receipt with this id
    #[error("Receipt not found: {id}")]
    ReceiptNotFound {
        /// Requested receipt id
        id: i64,
    },

    /// No line with this id
    #[error("Line not found: {id}")]
    LineNotFound {
        /// Requested line id
        id: i64,
    },

    /// No participant with this name or id on the receipt
    #[error("Participant not found: {name}")]
    ParticipantNotFound {
        /// Participant name (or id rendered as text)
        name: String,
    },

    /// Monetary amount was negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Input failed validation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human-readable description
        message: String,
    },

    /// Fee lines are split proportionally and cannot be assigned
    #[error("Line {line_id} is a fee and cannot be assigned to a participant")]
    FeeLineNotAssignable {
        /// The fee line's id
        line_id: i64,
    },

    /// The extraction oracle returned an error or an unusable reply
    #[error("Extraction failed: {message}")]
    Extraction {
        /// Reason reported by (or about) the oracle
        message: String,
    },

    /// JSON decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatting into a report buffer failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Integer argument could not be parsed
    #[error("Invalid number: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

/// Rejects amounts that are negative or not finite.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] when the amount is NaN, infinite or below zero.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}
