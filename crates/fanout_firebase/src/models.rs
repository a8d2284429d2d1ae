//! Models for the push fan-out
//!
//! Registration types live in `fanout_common` and are re-exported here next to
//! the delivery and statistics types produced by this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use fanout_common::models::{
    FailureReason, Outcome, PushMessage, Registration, RegistrationMetadata, RegistrationSummary,
};

/// How the targets of a broadcast were chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Every active registration.
    #[default]
    All,
    /// Active registrations whose selection flag is set.
    Selected,
    /// Active registrations of one identity.
    Identity,
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetMode::All => f.write_str("all"),
            TargetMode::Selected => f.write_str("selected"),
            TargetMode::Identity => f.write_str("identity"),
        }
    }
}

/// A concrete target selection resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Selected,
    Identity(String),
}

impl Target {
    pub fn mode(&self) -> TargetMode {
        match self {
            Target::All => TargetMode::All,
            Target::Selected => TargetMode::Selected,
            Target::Identity(_) => TargetMode::Identity,
        }
    }
}

/// An address the provider accepted the message for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliverySuccess {
    pub address: String,
    pub message_id: String,
}

/// An address the message could not be delivered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveryFailure {
    pub address: String,
    pub reason: FailureReason,
    pub message: String,
}

/// Aggregated per-address outcome of one broadcast.
///
/// `successes.len() + failures.len() == total` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveryResult {
    pub id: String,
    pub mode: TargetMode,
    pub successes: Vec<DeliverySuccess>,
    pub failures: Vec<DeliveryFailure>,
    pub total: usize,
    /// Number of provider calls issued.
    pub batches: usize,
}

impl DeliveryResult {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Addresses the provider reported as permanently invalid.
    pub fn permanently_invalid(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|f| f.reason.is_permanent())
            .map(|f| f.address.as_str())
    }
}

/// Immutable record of one broadcast attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageHistoryEntry {
    pub id: String,
    pub title: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub mode: TargetMode,
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Result of a registration call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistrationResult {
    pub is_new: bool,
    pub registration: Registration,
    pub total_registrations: usize,
}

/// Aggregate registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatsSnapshot {
    pub total_registrations: usize,
    pub active_registrations: usize,
    pub inactive_registrations: usize,
    pub selected_registrations: usize,
    /// Registrations created within the last 24 hours.
    pub recent_registrations: usize,
    /// Registrations per platform; missing platforms count as `unknown`.
    pub platforms: BTreeMap<String, usize>,
    pub total_successful_deliveries: u64,
    pub total_failed_deliveries: u64,
}

/// What applying delivery outcomes changed in the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeedbackSummary {
    pub successes_applied: usize,
    pub failures_applied: usize,
    pub deactivated: usize,
    /// Outcomes for addresses that were unregistered while the broadcast ran.
    pub unknown_addresses: usize,
}
