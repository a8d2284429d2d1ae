//! Test fixtures for the fanout integration tests
//!
//! A deterministic provider and helpers to build services and configs.
#![allow(dead_code)]

use fanout_common::{BoxFuture, FailureReason, Outcome, ProviderError, PushMessage, PushProvider};
use fanout_config::{AppConfig, DeliveryConfig, RegistryConfig};
use fanout_firebase::PushService;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Accepts every address except the scripted rejections.
#[derive(Default)]
pub struct FakeProvider {
    rejections: HashMap<String, FailureReason>,
    calls: Mutex<Vec<(Vec<String>, PushMessage)>>,
}

impl FakeProvider {
    pub fn rejecting(rejections: &[(&str, FailureReason)]) -> Self {
        Self {
            rejections: rejections
                .iter()
                .map(|(address, reason)| (address.to_string(), *reason))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every provider call seen so far, with the message it carried.
    pub fn calls(&self) -> Vec<(Vec<String>, PushMessage)> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, address: &str) -> Outcome {
        match self.rejections.get(address) {
            Some(reason) => Outcome::failed(*reason, format!("rejected {address}")),
            None => Outcome::delivered(format!("projects/fake/messages/{address}")),
        }
    }
}

impl PushProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn send_one<'a>(
        &'a self,
        address: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Outcome, ProviderError> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((vec![address.to_string()], message.clone()));
            Ok(self.answer(address))
        })
    }

    fn send_batch<'a>(
        &'a self,
        addresses: &'a [String],
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Vec<Outcome>, ProviderError> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((addresses.to_vec(), message.clone()));
            Ok(addresses.iter().map(|a| self.answer(a)).collect())
        })
    }
}

pub fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        registry: RegistryConfig {
            max_registrations: 100,
            cleanup_interval_secs: None,
        },
        delivery: DeliveryConfig {
            inter_batch_delay_ms: 0,
            default_title: "Default title".to_string(),
            default_body: "Default body".to_string(),
        },
        ..Default::default()
    })
}

pub fn service_with(provider: Arc<FakeProvider>) -> Arc<PushService> {
    Arc::new(PushService::new(provider, 100, Duration::ZERO))
}
