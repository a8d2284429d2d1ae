//! Provider used when no Firebase credentials are configured.
//!
//! Every address is accepted and gets a fresh message name, so the registry
//! and the delivery pipeline can be exercised end to end without network
//! access.

use fanout_common::{
    address_preview, BoxFuture, Outcome, ProviderError, PushMessage, PushProvider,
};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatingProvider;

impl SimulatingProvider {
    pub fn new() -> Self {
        Self
    }

    fn accept(address: &str, message: &PushMessage) -> Outcome {
        info!(
            "[simulated] '{}' to {}",
            message.title,
            address_preview(address)
        );
        Outcome::delivered(format!("projects/simulated/messages/{}", Uuid::new_v4()))
    }
}

impl PushProvider for SimulatingProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn send_one<'a>(
        &'a self,
        address: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Outcome, ProviderError> {
        Box::pin(async move { Ok(Self::accept(address, message)) })
    }

    fn send_batch<'a>(
        &'a self,
        addresses: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Vec<Outcome>, ProviderError> {
        Box::pin(async move {
            Ok(addresses
                .iter()
                .map(|address| Self::accept(address, message))
                .collect())
        })
    }
}
