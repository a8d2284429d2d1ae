//! Environment variable handling for the fanout service.
//!
//! Structured configuration is read from `FANOUT_`-prefixed variables with `__`
//! separating nested keys. The flat variable names used by earlier deployments
//! (`HOST`, `PORT`, `MAX_TOKENS`, ...) are still honoured on top of that.

use crate::models::{AppConfig, FirebaseConfig};
use serde_json::Value;
use std::env;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "FANOUT";

/// The separator for nested configuration keys
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator between the prefix and the first key
pub const PREFIX_SEPARATOR: &str = "_";

/// Marker value that is replaced by an environment variable at load time
pub const SECRET_MARKER: &str = "secret_from_env";

pub const LEGACY_HOST: &str = "HOST";
pub const LEGACY_PORT: &str = "PORT";
pub const LEGACY_MAX_TOKENS: &str = "MAX_TOKENS";
pub const LEGACY_SERVICE_ACCOUNT_PATH: &str = "SERVICE_ACCOUNT_PATH";
pub const LEGACY_FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
pub const LEGACY_CORS_ORIGINS: &str = "CORS_ORIGINS";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// `"server.port"` becomes `"FANOUT_SERVER__PORT"`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, PREFIX_SEPARATOR, path).to_uppercase()
}

/// Name of the variable that replaces a `secret_from_env` marker at `path`.
///
/// `["firebase", "key_path"]` becomes `"FIREBASE_KEY_PATH"`.
pub fn secret_path_to_env_var(path: &[String]) -> String {
    path.join("_").to_uppercase()
}

/// Recursively replaces every `secret_from_env` string with the matching
/// environment variable. Returns `true` if any marker was replaced.
pub fn inject_env_secrets<F>(value: &mut Value, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    fn walk<F>(path: &mut Vec<String>, obj: &mut Value, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        match obj {
            Value::Object(map) => {
                let mut replaced = false;
                for (k, v) in map.iter_mut() {
                    path.push(k.clone());
                    replaced |= walk(path, v, lookup);
                    path.pop();
                }
                replaced
            }
            Value::String(s) if s == SECRET_MARKER => {
                let env_key = secret_path_to_env_var(path);
                match lookup(&env_key) {
                    Some(env_val) => {
                        *obj = Value::String(env_val);
                        true
                    }
                    None => {
                        tracing::warn!("env var {} not found for {}", env_key, SECRET_MARKER);
                        false
                    }
                }
            }
            _ => false,
        }
    }

    walk(&mut Vec::new(), value, lookup)
}

fn note_legacy(var: &str, path: &str) {
    tracing::info!(
        "{} is a legacy variable, prefer {}",
        var,
        config_path_to_env_var(path)
    );
}

/// Applies the flat variables of earlier deployments on top of `config`.
///
/// `CORS_ORIGINS` is a comma separated list appended to the configured origins;
/// every other variable replaces its field. Values that fail to parse are
/// ignored with a warning.
pub fn apply_legacy_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(LEGACY_HOST) {
        note_legacy(LEGACY_HOST, "server.host");
        config.server.host = host;
    }
    if let Some(port) = lookup(LEGACY_PORT) {
        note_legacy(LEGACY_PORT, "server.port");
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("ignoring invalid {}={}", LEGACY_PORT, port),
        }
    }
    if let Some(max) = lookup(LEGACY_MAX_TOKENS) {
        note_legacy(LEGACY_MAX_TOKENS, "registry.max_registrations");
        match max.trim().parse() {
            Ok(max) => config.registry.max_registrations = max,
            Err(_) => tracing::warn!("ignoring invalid {}={}", LEGACY_MAX_TOKENS, max),
        }
    }
    if let Some(key_path) = lookup(LEGACY_SERVICE_ACCOUNT_PATH) {
        note_legacy(LEGACY_SERVICE_ACCOUNT_PATH, "firebase.key_path");
        config
            .firebase
            .get_or_insert_with(FirebaseConfig::default)
            .key_path = Some(key_path);
    }
    if let Some(project_id) = lookup(LEGACY_FIREBASE_PROJECT_ID) {
        note_legacy(LEGACY_FIREBASE_PROJECT_ID, "firebase.project_id");
        config
            .firebase
            .get_or_insert_with(FirebaseConfig::default)
            .project_id = Some(project_id);
    }
    if let Some(origins) = lookup(LEGACY_CORS_ORIGINS) {
        note_legacy(LEGACY_CORS_ORIGINS, "cors.origins");
        for origin in origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            if !config.cors.origins.iter().any(|known| known == origin) {
                config.cors.origins.push(origin.to_string());
            }
        }
    }
    config
}
