//! # Error Types
//!
//! Structured error types for devis_core. Most irregularities in quote input
//! (malformed rows, bad numbers, unknown profile codes, empty quantities) are
//! absorbed into default values and never reach this type. What remains are
//! the conditions a caller must act on: an unreadable source, a rejected
//! configuration, or a ledger I/O failure.
//!
//! ## Example
//!
//! ```rust
//! use devis_core::errors::{DevisError, DevisResult};
//!
//! fn validate_discount(pct: f64) -> DevisResult<()> {
//!     if !(0.0..=100.0).contains(&pct) {
//!         return Err(DevisError::InvalidInput {
//!             field: "beam_discount_pct".to_string(),
//!             value: pct.to_string(),
//!             reason: "Discount must be between 0 and 100".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for devis_core operations
pub type DevisResult<T> = Result<T, DevisError>;

/// Structured error type for quote operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum DevisError {
    /// The progiciel export could not be located or opened
    #[error("Source not found: '{path}'")]
    SourceNotFound { path: String },

    /// An input value is invalid (out of range, not finite, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration file missing or unparsable
    #[error("Configuration error in '{path}': {reason}")]
    ConfigError { path: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Ledger schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl DevisError {
    /// Create a SourceNotFound error
    pub fn source_not_found(path: impl Into<String>) -> Self {
        DevisError::SourceNotFound { path: path.into() }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        DevisError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a ConfigError
    pub fn config_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DevisError::ConfigError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        DevisError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        DevisError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DevisError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DevisError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            DevisError::InvalidInput { .. } => "INVALID_INPUT",
            DevisError::ConfigError { .. } => "CONFIG_ERROR",
            DevisError::FileError { .. } => "FILE_ERROR",
            DevisError::FileLocked { .. } => "FILE_LOCKED",
            DevisError::SerializationError { .. } => "SERIALIZATION_ERROR",
            DevisError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for DevisError {
    fn from(e: serde_json::Error) -> Self {
        DevisError::SerializationError {
            reason: e.to_string(),
        }
    }
}
