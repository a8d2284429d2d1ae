use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use fanout_firebase::PushService;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub registered_tokens: usize,
    pub active_tokens: usize,
    pub provider: &'static str,
    pub simulated: bool,
}

#[axum::debug_handler]
pub async fn health_handler(State(service): State<Arc<PushService>>) -> Json<HealthResponse> {
    let stats = service.stats().await;
    Json(HealthResponse {
        status: "Fanout push server running",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        registered_tokens: stats.total_registrations,
        active_tokens: stats.active_registrations,
        provider: service.provider_name(),
        simulated: service.is_simulated(),
    })
}
