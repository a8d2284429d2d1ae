//! Errors raised by the registry and the delivery pipeline.
//!
//! Per-address delivery failures are not errors: they are reported inside
//! [`crate::models::DeliveryResult`]. Provider faults are absorbed by the
//! pipeline, so only validation problems and an empty target set surface here.

use fanout_common::FanoutError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    /// Missing or malformed address or identity; nothing was mutated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A broadcast resolved to no deliverable address; the provider was not called.
    #[error("No targets: {0}")]
    NoTargets(String),
}

impl From<PushError> for FanoutError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::InvalidInput(msg) => FanoutError::ValidationError(msg),
            PushError::NoTargets(msg) => FanoutError::NoTargetsError(msg),
        }
    }
}
