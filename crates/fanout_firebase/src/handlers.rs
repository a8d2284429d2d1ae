//! HTTP handlers for the push fan-out
//!
//! Thin adapters between JSON requests and [`PushService`]. Domain errors are
//! converted into [`FanoutError`] and rendered as
//! `{"success": false, "error": {...}}` with the matching status code.
//!
//! The handlers are designed to be used with the Axum web framework and include
//! OpenAPI documentation when the `openapi` feature is enabled.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use fanout_common::logging::log_error;
use fanout_common::{map_json_error, validation_error, FanoutError};
use fanout_config::AppConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{
    DeliveryResult, MessageHistoryEntry, RegistrationMetadata, RegistrationSummary,
    StatsSnapshot, Target, TargetMode,
};
use crate::service::PushService;

/// Shared state for the push handlers
#[derive(Clone)]
pub struct PushState {
    pub config: Arc<AppConfig>,
    pub service: Arc<PushService>,
}

fn required(value: Option<String>, field: &str) -> Result<String, FanoutError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(validation_error(format!("No {} provided", field))),
    }
}

fn default_true() -> bool {
    true
}

/// Request body for registering a delivery address
///
/// `token` and `user_id` are accepted as aliases of `address` and `identity`.
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterRequest {
    #[serde(alias = "token")]
    pub address: Option<String>,
    #[serde(alias = "user_id")]
    pub identity: Option<String>,
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub platform: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub client_info: Option<serde_json::Value>,
    /// Client-side registration time.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub is_new: bool,
    pub registration: RegistrationSummary,
    pub total_registrations: usize,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnregisterRequest {
    #[serde(alias = "token")]
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnregisterResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_registrations: usize,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegistrationsResponse {
    pub success: bool,
    pub count: usize,
    pub registrations: Vec<RegistrationSummary>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SearchQuery {
    /// Matched case-insensitively against identity, display name and contact.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SelectionRequest {
    pub identities: Vec<String>,
    #[serde(default = "default_true")]
    pub selected: bool,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SelectAllRequest {
    #[serde(default = "default_true")]
    pub selected: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SelectionResponse {
    pub success: bool,
    pub updated: usize,
}

/// Request body for a broadcast
///
/// Missing title or body fall back to the configured defaults.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BroadcastRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<HashMap<String, String>>,
    /// `all` (default) or `selected`.
    #[serde(default)]
    pub mode: TargetMode,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotifyIdentityRequest {
    #[serde(alias = "user_id")]
    pub identity: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BroadcastResponse {
    pub success: bool,
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub result: DeliveryResult,
}

impl From<DeliveryResult> for BroadcastResponse {
    fn from(result: DeliveryResult) -> Self {
        Self {
            success: true,
            message: format!("Broadcast sent to {} devices", result.success_count()),
            sent: result.success_count(),
            failed: result.failure_count(),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<MessageHistoryEntry>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsSnapshot,
    pub provider: String,
    pub simulated: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CleanupResponse {
    pub success: bool,
    pub removed: usize,
    pub total_registrations: usize,
}

/// Register an address or refresh an existing registration.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Address registered or updated", body = RegisterResponse),
        (status = 400, description = "Missing or malformed address or identity")
    ),
    tag = "Push"
))]
pub async fn register_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, Response> {
    let address = required(payload.address, "token").map_err(IntoResponse::into_response)?;
    let identity = required(payload.identity, "identity").map_err(IntoResponse::into_response)?;
    let metadata = RegistrationMetadata {
        display_name: payload.display_name,
        contact: payload.contact,
        platform: payload.platform,
        client_info: payload.client_info,
        client_timestamp: payload.timestamp,
    };

    let result = state.service.register(&address, &identity, metadata).await;
    map_json_error(
        result.map(|r| RegisterResponse {
            success: true,
            message: if r.is_new {
                "New token registered".to_string()
            } else {
                "Token updated".to_string()
            },
            is_new: r.is_new,
            registration: r.registration.summary(),
            total_registrations: r.total_registrations,
        }),
        FanoutError::from,
    )
}

/// Remove a registration.
///
/// An unknown address answers 404 with `success: false`; repeated disconnect
/// signals end up here and are not treated as server errors.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/unregister",
    request_body = UnregisterRequest,
    responses(
        (status = 200, description = "Registration removed", body = UnregisterResponse),
        (status = 400, description = "No address provided"),
        (status = 404, description = "Address not registered", body = UnregisterResponse)
    ),
    tag = "Push"
))]
pub async fn unregister_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<UnregisterRequest>,
) -> Response {
    let address = match required(payload.address, "token") {
        Ok(address) => address,
        Err(err) => return err.into_response(),
    };

    let removed = state.service.unregister(&address).await;
    let total_registrations = state.service.len().await;
    if removed {
        Json(UnregisterResponse {
            success: true,
            message: "Token unregistered successfully".to_string(),
            error: None,
            total_registrations,
        })
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(UnregisterResponse {
                success: false,
                message: "Token not found in registry".to_string(),
                error: Some("User not found or already unregistered".to_string()),
                total_registrations,
            }),
        )
            .into_response()
    }
}

/// List active registrations without exposing full addresses.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/push/registrations",
    responses(
        (status = 200, description = "Active registrations", body = RegistrationsResponse)
    ),
    tag = "Push"
))]
pub async fn list_registrations_handler(
    State(state): State<Arc<PushState>>,
) -> Json<RegistrationsResponse> {
    let registrations = state.service.list_active().await;
    Json(RegistrationsResponse {
        success: true,
        count: registrations.len(),
        registrations,
    })
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/push/registrations/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching active registrations", body = RegistrationsResponse),
        (status = 400, description = "Empty query")
    ),
    tag = "Push"
))]
pub async fn search_registrations_handler(
    State(state): State<Arc<PushState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<RegistrationsResponse>, Response> {
    let result = state
        .service
        .search(query.q.as_deref().unwrap_or_default())
        .await;
    map_json_error(
        result.map(|found| {
            let registrations: Vec<RegistrationSummary> =
                found.iter().map(|r| r.summary()).collect();
            RegistrationsResponse {
                success: true,
                count: registrations.len(),
                registrations,
            }
        }),
        FanoutError::from,
    )
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/selection",
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Selection flags updated", body = SelectionResponse)
    ),
    tag = "Push"
))]
pub async fn set_selection_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<SelectionRequest>,
) -> Json<SelectionResponse> {
    let updated = state
        .service
        .set_selection(&payload.identities, payload.selected)
        .await;
    debug!("Selection set to {} on {} registrations", payload.selected, updated);
    Json(SelectionResponse {
        success: true,
        updated,
    })
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/selection/all",
    request_body = SelectAllRequest,
    responses(
        (status = 200, description = "Selection flags updated", body = SelectionResponse)
    ),
    tag = "Push"
))]
pub async fn select_all_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<SelectAllRequest>,
) -> Json<SelectionResponse> {
    let updated = state.service.select_all(payload.selected).await;
    Json(SelectionResponse {
        success: true,
        updated,
    })
}

/// Broadcast to every active or every selected registration.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Broadcast attempted; per-address outcomes in `result`", body = BroadcastResponse),
        (status = 400, description = "No active or selected registrations")
    ),
    tag = "Push"
))]
pub async fn broadcast_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, Response> {
    let target = match payload.mode {
        TargetMode::Selected => Target::Selected,
        TargetMode::All => Target::All,
        TargetMode::Identity => {
            return Err(
                validation_error("use /push/notify-identity for identity targets").into_response(),
            )
        }
    };
    let delivery = &state.config.delivery;
    let title = payload.title.unwrap_or_else(|| delivery.default_title.clone());
    let body = payload.body.unwrap_or_else(|| delivery.default_body.clone());

    info!("Broadcast '{}' requested for {} registrations", title, target.mode());
    let result = state
        .service
        .broadcast(target, &title, &body, payload.data.unwrap_or_default())
        .await;
    if let Err(err) = &result {
        log_error(err, "Broadcast failed");
    }
    map_json_error(result.map(BroadcastResponse::from), FanoutError::from)
}

/// Send to every active address of one identity.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/notify-identity",
    request_body = NotifyIdentityRequest,
    responses(
        (status = 200, description = "Notification attempted", body = BroadcastResponse),
        (status = 400, description = "Missing identity or no active registrations for it")
    ),
    tag = "Push"
))]
pub async fn notify_identity_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<NotifyIdentityRequest>,
) -> Result<Json<BroadcastResponse>, Response> {
    let identity = required(payload.identity, "identity").map_err(IntoResponse::into_response)?;
    let delivery = &state.config.delivery;
    let title = payload.title.unwrap_or_else(|| delivery.default_title.clone());
    let body = payload.body.unwrap_or_else(|| delivery.default_body.clone());

    let result = state
        .service
        .notify_identity(&identity, &title, &body, payload.data.unwrap_or_default())
        .await;
    map_json_error(result.map(BroadcastResponse::from), FanoutError::from)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/push/history",
    responses(
        (status = 200, description = "Recent broadcasts, newest first", body = HistoryResponse)
    ),
    tag = "Push"
))]
pub async fn history_handler(State(state): State<Arc<PushState>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        success: true,
        history: state.service.history().await,
    })
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/push/stats",
    responses(
        (status = 200, description = "Registry statistics", body = StatsResponse)
    ),
    tag = "Push"
))]
pub async fn stats_handler(State(state): State<Arc<PushState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.service.stats().await,
        provider: state.service.provider_name().to_string(),
        simulated: state.service.is_simulated(),
    })
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/push/cleanup",
    responses(
        (status = 200, description = "Inactive and stale registrations removed", body = CleanupResponse)
    ),
    tag = "Push"
))]
pub async fn cleanup_handler(State(state): State<Arc<PushState>>) -> Json<CleanupResponse> {
    let removed = state.service.cleanup().await;
    Json(CleanupResponse {
        success: true,
        removed,
        total_registrations: state.service.len().await,
    })
}
