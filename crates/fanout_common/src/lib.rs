// --- File: crates/fanout_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Registration and delivery data structures
pub mod services; // Provider abstraction

// Re-export error types and utilities for easier access
pub use error::{validation_error, FanoutError, HttpStatusCode};

// Re-export HTTP utilities for easier access
pub use http::{client::create_client, map_json_error};

pub use models::{
    address_preview, FailureReason, Outcome, PushMessage, Registration, RegistrationMetadata,
    RegistrationSummary,
};
pub use services::{BoxFuture, ProviderError, PushProvider, MAX_MULTICAST_SIZE};
