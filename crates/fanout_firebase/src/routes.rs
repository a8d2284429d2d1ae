use axum::{
    routing::{get, post},
    Router,
};
use fanout_config::AppConfig;
use std::sync::Arc;
use tracing::info;

use crate::handlers::{
    broadcast_handler, cleanup_handler, history_handler, list_registrations_handler,
    notify_identity_handler, register_handler, search_registrations_handler, select_all_handler,
    set_selection_handler, stats_handler, unregister_handler, PushState,
};
use crate::service::PushService;

/// Create the push routes for the API
///
/// The service is built by the caller (usually through
/// [`crate::FirebaseServiceFactory`]) so the same instance can be shared with
/// background tasks such as the scheduled cleanup.
///
/// # Arguments
///
/// * `config` - Application configuration; supplies default titles and bodies
/// * `service` - The push service the handlers operate on
///
/// # Returns
///
/// An Axum router with the push endpoints, to be nested under `/api`
pub fn routes(config: Arc<AppConfig>, service: Arc<PushService>) -> Router {
    info!(
        "Push routes initialized (provider: {})",
        service.provider_name()
    );

    let state = Arc::new(PushState { config, service });

    Router::new()
        .route("/push/register", post(register_handler))
        .route("/push/unregister", post(unregister_handler))
        .route("/push/registrations", get(list_registrations_handler))
        .route(
            "/push/registrations/search",
            get(search_registrations_handler),
        )
        .route("/push/selection", post(set_selection_handler))
        .route("/push/selection/all", post(select_all_handler))
        .route("/push/broadcast", post(broadcast_handler))
        .route("/push/notify-identity", post(notify_identity_handler))
        .route("/push/history", get(history_handler))
        .route("/push/stats", get(stats_handler))
        .route("/push/cleanup", post(cleanup_handler))
        .with_state(state)
}
