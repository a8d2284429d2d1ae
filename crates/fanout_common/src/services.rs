// --- File: crates/fanout_common/src/services.rs ---
//! Service abstractions for external services.
//!
//! The push provider is consumed through the [`PushProvider`] trait so the
//! delivery pipeline can run against the live Firebase client, the simulating
//! provider used without credentials, or a deterministic fake in tests.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::models::{Outcome, PushMessage};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Largest number of addresses a provider accepts in one multicast call.
pub const MAX_MULTICAST_SIZE: usize = 500;

/// A fault of a provider call as a whole, as opposed to a per-address rejection.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials could not be turned into an access token.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The provider is missing required configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// The push-delivery capability.
///
/// Implementations report per-address rejections as [`Outcome::Failed`] and
/// reserve `Err` for faults that affect the whole call.
pub trait PushProvider: Send + Sync {
    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Whether this provider only pretends to send.
    fn is_simulated(&self) -> bool {
        false
    }

    /// Send one message to one address.
    fn send_one<'a>(
        &'a self,
        address: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Outcome, ProviderError>;

    /// Send one message to at most [`MAX_MULTICAST_SIZE`] addresses.
    ///
    /// The returned outcomes are aligned positionally with `addresses`.
    fn send_batch<'a>(
        &'a self,
        addresses: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Vec<Outcome>, ProviderError>;
}
