// --- File: crates/fanout_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The HTTP-facing error type of the fanout service.
///
/// Domain crates convert their own errors into this one at the API boundary
/// by implementing `From<SpecificError> for FanoutError`.
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A broadcast resolved to no target addresses
    #[error("No targets: {0}")]
    NoTargetsError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for FanoutError {
    fn status_code(&self) -> u16 {
        match self {
            FanoutError::ValidationError(_) => 400,
            FanoutError::NoTargetsError(_) => 400,
        }
    }
}

// Utility functions for error handling
pub fn validation_error<T: fmt::Display>(message: T) -> FanoutError {
    FanoutError::ValidationError(message.to_string())
}
