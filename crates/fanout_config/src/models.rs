// --- File: crates/fanout_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

// --- Firebase Config ---
// Without both values the service runs with the simulating provider.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>, // Loaded via FANOUT_FIREBASE__PROJECT_ID or FIREBASE_PROJECT_ID
    pub key_path: Option<String>,   // Loaded via FANOUT_FIREBASE__KEY_PATH or SERVICE_ACCOUNT_PATH
}

// --- Registry Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity ceiling; reaching it triggers a cleanup sweep before the next insert.
    pub max_registrations: usize,
    /// Interval of the background cleanup sweep. `None` disables the schedule.
    pub cleanup_interval_secs: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_registrations: 10_000,
            cleanup_interval_secs: Some(3600),
        }
    }
}

// --- Delivery Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Pause between two provider batches, in milliseconds.
    pub inter_batch_delay_ms: u64,
    /// Title used when a broadcast request omits one.
    pub default_title: String,
    /// Body used when a broadcast request omits one.
    pub default_body: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            inter_batch_delay_ms: 100,
            default_title: "Fanout Notification".to_string(),
            default_body: "This is a test message from the fanout server.".to_string(),
        }
    }
}

// --- CORS Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub origins: Vec<String>, // Extended via comma separated CORS_ORIGINS
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:5500".to_string(),
                "http://10.129.52.107:3000".to_string(),
            ],
        }
    }
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Optional log file written next to stdout output.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
