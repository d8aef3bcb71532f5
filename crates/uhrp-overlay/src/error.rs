//! Error types for uhrp-overlay

use thiserror::Error;
use uhrp_core::{AdmissionError, TransactionError};
use uhrp_storage::StorageError;

/// Errors returned by the lookup service
#[derive(Debug, Error)]
pub enum LookupError {
    /// No query, or a falsy one, was supplied
    #[error("A valid query must be provided")]
    InvalidQuery,

    /// An event arrived in a payload mode this service did not register for
    #[error("Invalid payload: expected {expected} mode, got {actual}")]
    InvalidPayload {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from assembling or driving a whole overlay
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_display() {
        let err = LookupError::InvalidPayload {
            expected: "locking-script",
            actual: "whole-tx",
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload: expected locking-script mode, got whole-tx"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: LookupError = StorageError::database("gone").into();
        assert!(matches!(err, LookupError::Storage(_)));

        let err: OverlayError = err.into();
        assert!(matches!(err, OverlayError::Lookup(LookupError::Storage(_))));
    }

    #[test]
    fn test_admission_error_is_transparent() {
        let err: OverlayError = AdmissionError::NoValidToken.into();
        assert_eq!(err.to_string(), AdmissionError::NoValidToken.to_string());
    }
}
