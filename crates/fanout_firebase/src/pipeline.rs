//! Batched delivery pipeline
//!
//! Partitions a target list into provider-sized batches, sends them one after
//! another and turns every per-address provider answer into a
//! [`DeliverySuccess`] or [`DeliveryFailure`]. A batch whose provider call
//! faults as a whole is recorded as failed for every address in it; nothing is
//! retried here.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::PushError;
use crate::models::{
    DeliveryFailure, DeliveryResult, DeliverySuccess, FailureReason, MessageHistoryEntry, Outcome,
    PushMessage, TargetMode,
};
use crate::registry::is_well_formed_address;
use fanout_common::{address_preview, PushProvider, MAX_MULTICAST_SIZE};

/// Number of broadcasts kept in the message history.
pub const HISTORY_CAPACITY: usize = 50;

/// Value of the `server` data key stamped into every message.
pub const SERVER_TAG: &str = "fanout";

pub struct DeliveryPipeline {
    provider: Arc<dyn PushProvider>,
    batch_size: usize,
    inter_batch_delay: Duration,
    history: Mutex<VecDeque<MessageHistoryEntry>>,
}

impl DeliveryPipeline {
    /// Create a pipeline sending through `provider`, pausing
    /// `inter_batch_delay` between consecutive batches.
    pub fn new(provider: Arc<dyn PushProvider>, inter_batch_delay: Duration) -> Self {
        Self {
            provider,
            batch_size: MAX_MULTICAST_SIZE,
            inter_batch_delay,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    pub fn provider(&self) -> &Arc<dyn PushProvider> {
        &self.provider
    }

    /// Deliver one message to every well-formed address in `addresses`.
    ///
    /// Fails with [`PushError::NoTargets`] before any provider call if no
    /// address survives validation. Per-address failures never turn into an
    /// error; they are part of the returned [`DeliveryResult`].
    pub async fn broadcast(
        &self,
        addresses: &[String],
        title: &str,
        body: &str,
        data: HashMap<String, String>,
        mode: TargetMode,
    ) -> Result<DeliveryResult, PushError> {
        let targets: Vec<String> = addresses
            .iter()
            .filter(|address| is_well_formed_address(address))
            .cloned()
            .collect();

        if targets.len() < addresses.len() {
            warn!(
                "Skipping {} malformed addresses in {} broadcast",
                addresses.len() - targets.len(),
                mode
            );
        }
        if targets.is_empty() {
            return Err(PushError::NoTargets(format!(
                "no deliverable addresses for {} broadcast",
                mode
            )));
        }

        let message = stamp_message(title, body, data);
        let batch_count = targets.len().div_ceil(self.batch_size);
        info!(
            "Broadcasting to {} addresses in {} batches via {}",
            targets.len(),
            batch_count,
            self.provider.name()
        );

        let mut successes = Vec::with_capacity(targets.len());
        let mut failures = Vec::new();

        for (index, batch) in targets.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }

            let outcomes = self.send_chunk(batch, &message).await;
            for (address, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Outcome::Delivered { message_id } => successes.push(DeliverySuccess {
                        address: address.clone(),
                        message_id,
                    }),
                    Outcome::Failed { reason, message } => {
                        debug!(
                            "Delivery to {} failed: {} ({})",
                            address_preview(address),
                            reason,
                            message
                        );
                        failures.push(DeliveryFailure {
                            address: address.clone(),
                            reason,
                            message,
                        })
                    }
                }
            }
        }

        let result = DeliveryResult {
            id: Uuid::new_v4().to_string(),
            mode,
            total: targets.len(),
            batches: batch_count,
            successes,
            failures,
        };

        info!(
            "Broadcast completed: {} successful, {} failed",
            result.success_count(),
            result.failure_count()
        );

        self.record(MessageHistoryEntry {
            id: result.id.clone(),
            title: message.title,
            body: message.body,
            sent_at: Utc::now(),
            mode,
            total: result.total,
            success_count: result.success_count(),
            failure_count: result.failure_count(),
        })
        .await;

        Ok(result)
    }

    /// Snapshot of the message history, most recent first.
    pub async fn history(&self) -> Vec<MessageHistoryEntry> {
        self.history.lock().await.iter().cloned().collect()
    }

    async fn record(&self, entry: MessageHistoryEntry) {
        let mut history = self.history.lock().await;
        history.push_front(entry);
        history.truncate(HISTORY_CAPACITY);
    }

    /// Send one batch and return exactly one outcome per address.
    async fn send_chunk(&self, batch: &[String], message: &PushMessage) -> Vec<Outcome> {
        let sent = match batch {
            [single] => self
                .provider
                .send_one(single, message)
                .await
                .map(|outcome| vec![outcome]),
            _ => self.provider.send_batch(batch, message).await,
        };

        match sent {
            Ok(mut outcomes) => {
                if outcomes.len() != batch.len() {
                    warn!(
                        "Provider returned {} outcomes for a batch of {}",
                        outcomes.len(),
                        batch.len()
                    );
                    outcomes.truncate(batch.len());
                    outcomes.resize_with(batch.len(), || {
                        Outcome::failed(
                            FailureReason::Unknown,
                            "provider returned no outcome for this address",
                        )
                    });
                }
                outcomes
            }
            Err(err) => {
                error!("Batch of {} failed at transport level: {}", batch.len(), err);
                batch
                    .iter()
                    .map(|_| Outcome::failed(FailureReason::BatchTransportFailure, err.to_string()))
                    .collect()
            }
        }
    }
}

fn stamp_message(title: &str, body: &str, mut data: HashMap<String, String>) -> PushMessage {
    data.insert("timestamp".to_string(), Utc::now().to_rfc3339());
    data.insert("server".to_string(), SERVER_TAG.to_string());
    PushMessage {
        title: title.to_string(),
        body: body.to_string(),
        data,
    }
}
