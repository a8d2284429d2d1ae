// #![cfg(feature = "openapi")] // not needed as we do this in lib.rs already!
use utoipa::OpenApi;

use crate::handlers::{
    BroadcastRequest, BroadcastResponse, CleanupResponse, HistoryResponse, NotifyIdentityRequest,
    RegisterRequest, RegisterResponse, RegistrationsResponse, SelectAllRequest, SelectionRequest,
    SelectionResponse, StatsResponse, UnregisterRequest, UnregisterResponse,
};
use crate::models::{
    DeliveryFailure, DeliveryResult, DeliverySuccess, FailureReason, MessageHistoryEntry,
    RegistrationSummary, StatsSnapshot, TargetMode,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::register_handler,
        crate::handlers::unregister_handler,
        crate::handlers::list_registrations_handler,
        crate::handlers::search_registrations_handler,
        crate::handlers::set_selection_handler,
        crate::handlers::select_all_handler,
        crate::handlers::broadcast_handler,
        crate::handlers::notify_identity_handler,
        crate::handlers::history_handler,
        crate::handlers::stats_handler,
        crate::handlers::cleanup_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            RegisterResponse,
            UnregisterRequest,
            UnregisterResponse,
            RegistrationsResponse,
            RegistrationSummary,
            SelectionRequest,
            SelectAllRequest,
            SelectionResponse,
            BroadcastRequest,
            NotifyIdentityRequest,
            BroadcastResponse,
            DeliveryResult,
            DeliverySuccess,
            DeliveryFailure,
            FailureReason,
            TargetMode,
            HistoryResponse,
            MessageHistoryEntry,
            StatsResponse,
            StatsSnapshot,
            CleanupResponse,
        )
    ),
    tags(
        (name = "Push", description = "Device registry and push broadcast API")
    ),
    servers(
        (url = "/api", description = "Fanout push API server")
    )
)]
pub struct PushApiDoc;
