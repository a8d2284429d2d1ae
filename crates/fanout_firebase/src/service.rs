//! Push service facade and factory.
//!
//! [`PushService`] ties the registry, the delivery pipeline and the feedback
//! loop together behind the operations the HTTP layer exposes.
//! [`FirebaseServiceFactory`] picks the provider from configuration.

use chrono::Utc;
use fanout_common::logging::log_result;
use fanout_common::PushProvider;
use fanout_config::AppConfig;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::verify_service_account_key;
use crate::client::FirebaseClient;
use crate::error::PushError;
use crate::feedback;
use crate::models::{
    DeliveryResult, MessageHistoryEntry, Registration, RegistrationMetadata, RegistrationResult,
    RegistrationSummary, StatsSnapshot, Target,
};
use crate::pipeline::DeliveryPipeline;
use crate::registry::Registry;
use crate::simulator::SimulatingProvider;

/// The fan-out core: one registry, one pipeline.
///
/// Every registry mutation goes through the write half of a single lock. A
/// broadcast only holds the read half while resolving its targets, so the
/// pipeline's inter-batch pauses never block registrations.
pub struct PushService {
    registry: RwLock<Registry>,
    pipeline: DeliveryPipeline,
}

impl PushService {
    pub fn new(
        provider: Arc<dyn PushProvider>,
        max_registrations: usize,
        inter_batch_delay: Duration,
    ) -> Self {
        Self {
            registry: RwLock::new(Registry::new(max_registrations)),
            pipeline: DeliveryPipeline::new(provider, inter_batch_delay),
        }
    }

    /// Build a service using the registry and delivery settings of `config`.
    pub fn from_config(provider: Arc<dyn PushProvider>, config: &AppConfig) -> Self {
        Self::new(
            provider,
            config.registry.max_registrations,
            Duration::from_millis(config.delivery.inter_batch_delay_ms),
        )
    }

    pub fn provider_name(&self) -> &'static str {
        self.pipeline.provider().name()
    }

    pub fn is_simulated(&self) -> bool {
        self.pipeline.provider().is_simulated()
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn register(
        &self,
        address: &str,
        identity: &str,
        metadata: RegistrationMetadata,
    ) -> Result<RegistrationResult, PushError> {
        let mut registry = self.registry.write().await;
        let (is_new, registration) = registry.register(address, identity, metadata, Utc::now())?;
        Ok(RegistrationResult {
            is_new,
            registration,
            total_registrations: registry.len(),
        })
    }

    /// Returns `false` if the address was not registered.
    pub async fn unregister(&self, address: &str) -> bool {
        self.registry.write().await.unregister(address)
    }

    pub async fn get(&self, address: &str) -> Option<Registration> {
        self.registry.read().await.get(address).cloned()
    }

    pub async fn list_active(&self) -> Vec<RegistrationSummary> {
        self.registry.read().await.summaries()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Registration>, PushError> {
        self.registry.read().await.search(query)
    }

    pub async fn set_selection(&self, identities: &[String], selected: bool) -> usize {
        let identities: HashSet<String> = identities
            .iter()
            .map(|identity| identity.trim().to_string())
            .filter(|identity| !identity.is_empty())
            .collect();
        self.registry
            .write()
            .await
            .set_selection(&identities, selected)
    }

    pub async fn select_all(&self, selected: bool) -> usize {
        self.registry.write().await.select_all(selected)
    }

    /// Send one message to the addresses `target` resolves to and fold the
    /// outcomes back into the registry.
    ///
    /// # Errors
    ///
    /// [`PushError::NoTargets`] if nothing is deliverable; the provider is
    /// not called in that case.
    pub async fn broadcast(
        &self,
        target: Target,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<DeliveryResult, PushError> {
        let addresses = self.registry.read().await.resolve_targets(&target);
        if addresses.is_empty() {
            return Err(PushError::NoTargets(match &target {
                Target::All => "no active registrations".to_string(),
                Target::Selected => "no selected registrations".to_string(),
                Target::Identity(identity) => {
                    format!("no active registrations for identity '{}'", identity)
                }
            }));
        }

        let result = self
            .pipeline
            .broadcast(&addresses, title, body, data, target.mode())
            .await?;

        let mut registry = self.registry.write().await;
        feedback::apply(&mut registry, &result, Utc::now());
        Ok(result)
    }

    /// Send to every active address of one identity.
    pub async fn notify_identity(
        &self,
        identity: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> Result<DeliveryResult, PushError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(PushError::InvalidInput("identity must not be empty".to_string()));
        }
        self.broadcast(Target::Identity(identity.to_string()), title, body, data)
            .await
    }

    pub async fn history(&self) -> Vec<MessageHistoryEntry> {
        self.pipeline.history().await
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.registry.read().await.stats(Utc::now())
    }

    /// Remove inactive and stale registrations. Returns the number removed.
    pub async fn cleanup(&self) -> usize {
        self.registry.write().await.cleanup(Utc::now())
    }
}

/// Firebase service factory.
///
/// Chooses the live FCM client when a project id and a readable service
/// account key are configured, and the simulating provider otherwise.
pub struct FirebaseServiceFactory {
    config: Arc<AppConfig>,
}

impl FirebaseServiceFactory {
    /// Create a new Firebase service factory.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    pub async fn provider(&self) -> Arc<dyn PushProvider> {
        let Some(firebase) = self.config.firebase.as_ref() else {
            warn!("No Firebase configuration; running in simulation mode");
            return Arc::new(SimulatingProvider::new());
        };

        let (Some(project_id), Some(key_path)) =
            (firebase.project_id.as_deref(), firebase.key_path.as_deref())
        else {
            warn!("Firebase project_id or key_path missing; running in simulation mode");
            return Arc::new(SimulatingProvider::new());
        };

        let verified = log_result(
            verify_service_account_key(Path::new(key_path)).await,
            "Firebase service account key found",
            "Cannot use Firebase service account",
        );
        if verified.is_err() {
            warn!("Running in simulation mode");
            return Arc::new(SimulatingProvider::new());
        }

        match FirebaseClient::new(project_id, key_path) {
            Ok(client) => {
                info!("Firebase Cloud Messaging enabled for project {}", project_id);
                Arc::new(client)
            }
            Err(e) => {
                warn!("Cannot create Firebase client ({}); running in simulation mode", e);
                Arc::new(SimulatingProvider::new())
            }
        }
    }

    pub async fn push_service(&self) -> PushService {
        PushService::from_config(self.provider().await, &self.config)
    }
}
