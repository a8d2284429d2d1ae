//! Push notification fan-out over Firebase Cloud Messaging
//!
//! This crate keeps an in-memory registry of device registrations, delivers
//! messages to them in provider-sized batches and feeds the per-address
//! outcomes back into the registry so that dead addresses stop receiving
//! traffic.
//!
//! # Features
//!
//! - Registry with identity, selection flag, liveness and delivery counters
//! - Batched delivery (500 addresses per provider call) with a bounded history
//! - Feedback loop that deactivates addresses FCM reports as permanently invalid
//! - Live FCM HTTP v1 client with service account authentication
//! - Simulation mode when no credentials are configured
//! - Integration with Axum for HTTP API endpoints
//! - OpenAPI/Swagger documentation (with the `openapi` feature)
//!
//! # Example
//!
//! ```rust,no_run
//! use fanout_config::AppConfig;
//! use fanout_firebase::{routes, FirebaseServiceFactory};
//! use std::sync::Arc;
//!
//! async fn setup_app() {
//!     let config = Arc::new(AppConfig::default());
//!     let service = Arc::new(FirebaseServiceFactory::new(config.clone()).push_service().await);
//!     let app = routes(config, service);
//!     // Use the app with your Axum server
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /push/register` - Register or refresh a delivery address
//! - `POST /push/unregister` - Remove a delivery address
//! - `POST /push/broadcast` - Send to all or to selected registrations
//! - `POST /push/notify-identity` - Send to every address of one identity

pub mod auth;
pub mod client;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod error;
pub mod feedback;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod routes;
pub mod service;
pub mod simulator;

// Re-export the routes function to be used by the main backend service
pub use routes::routes;
// Re-export the service and its factory
pub use error::PushError;
pub use service::{FirebaseServiceFactory, PushService};

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::PushApiDoc;
}
