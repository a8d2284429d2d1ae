// --- File: crates/fanout_common/src/models.rs ---

// Data structures shared by the registry, the delivery pipeline and the
// provider implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of characters of an address shown in logs and listings.
pub const ADDRESS_PREVIEW_LEN: usize = 20;

/// Shortens an address for logs and listings so full tokens are never exposed.
///
/// At most half of the address is kept, capped at [`ADDRESS_PREVIEW_LEN`].
pub fn address_preview(address: &str) -> String {
    let keep = (address.chars().count() / 2).min(ADDRESS_PREVIEW_LEN);
    let prefix: String = address.chars().take(keep).collect();
    format!("{}...", prefix)
}

/// Descriptive fields supplied with a registration call.
///
/// Every field is optional; on re-registration only the fields that are
/// present replace the stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistrationMetadata {
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub platform: Option<String>,
    /// Free-form client information (app version, OS build, ...).
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub client_info: Option<serde_json::Value>,
    /// Timestamp reported by the client when it registered.
    pub client_timestamp: Option<DateTime<Utc>>,
}

/// Represents one device registration, keyed by its delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Registration {
    /// The provider token. Immutable once created.
    pub address: String,

    /// The application-level user or device id. Not unique.
    pub identity: String,

    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub platform: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub client_info: Option<serde_json::Value>,
    pub client_timestamp: Option<DateTime<Utc>>,

    /// Set once on creation.
    pub registered_at: DateTime<Utc>,

    /// Refreshed on re-registration and on every successful delivery.
    pub last_active_at: DateTime<Utc>,

    /// Number of registration calls seen for this address, at least 1.
    pub registration_count: u32,

    pub successful_deliveries: u64,
    pub failed_deliveries: u64,

    /// False once the provider reported the address as permanently invalid.
    pub is_active: bool,

    /// Ephemeral targeting flag used by selected-only broadcasts.
    pub is_selected: bool,
}

impl Registration {
    /// Create a new, active and unselected registration.
    pub fn new(
        address: String,
        identity: String,
        metadata: RegistrationMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            address,
            identity,
            display_name: metadata.display_name,
            contact: metadata.contact,
            platform: metadata.platform,
            client_info: metadata.client_info,
            client_timestamp: metadata.client_timestamp,
            registered_at: now,
            last_active_at: now,
            registration_count: 1,
            successful_deliveries: 0,
            failed_deliveries: 0,
            is_active: true,
            is_selected: false,
        }
    }

    /// Overwrite the descriptive fields that are present in `metadata`.
    pub fn merge_metadata(&mut self, metadata: RegistrationMetadata) {
        if metadata.display_name.is_some() {
            self.display_name = metadata.display_name;
        }
        if metadata.contact.is_some() {
            self.contact = metadata.contact;
        }
        if metadata.platform.is_some() {
            self.platform = metadata.platform;
        }
        if metadata.client_info.is_some() {
            self.client_info = metadata.client_info;
        }
        if metadata.client_timestamp.is_some() {
            self.client_timestamp = metadata.client_timestamp;
        }
    }

    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            address_preview: address_preview(&self.address),
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            platform: self.platform.clone(),
            registered_at: self.registered_at,
            last_active_at: self.last_active_at,
            registration_count: self.registration_count,
            successful_deliveries: self.successful_deliveries,
            failed_deliveries: self.failed_deliveries,
            is_active: self.is_active,
            is_selected: self.is_selected,
        }
    }
}

/// Listing view of a registration that does not expose the full address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistrationSummary {
    pub address_preview: String,
    pub identity: String,
    pub display_name: Option<String>,
    pub platform: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub registration_count: u32,
    pub successful_deliveries: u64,
    pub failed_deliveries: u64,
    pub is_active: bool,
    pub is_selected: bool,
}

/// The content of one push message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Why the provider did not deliver to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The token is no longer registered with the provider.
    Unregistered,
    /// The provider rejected the token itself as malformed or foreign.
    InvalidToken,
    /// The message was rejected; the token may still be valid.
    InvalidPayload,
    RateLimited,
    Unavailable,
    /// The provider call for the whole batch faulted.
    BatchTransportFailure,
    Unknown,
}

impl FailureReason {
    /// The two reasons that mark an address as permanently invalid.
    pub fn is_permanent(self) -> bool {
        matches!(self, FailureReason::Unregistered | FailureReason::InvalidToken)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureReason::Unregistered => "UNREGISTERED",
            FailureReason::InvalidToken => "INVALID_TOKEN",
            FailureReason::InvalidPayload => "INVALID_PAYLOAD",
            FailureReason::RateLimited => "RATE_LIMITED",
            FailureReason::Unavailable => "UNAVAILABLE",
            FailureReason::BatchTransportFailure => "BATCH_TRANSPORT_FAILURE",
            FailureReason::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Per-address result of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Delivered {
        message_id: String,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl Outcome {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Outcome::Delivered {
            message_id: message_id.into(),
        }
    }

    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Outcome::Failed {
            reason,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }
}
