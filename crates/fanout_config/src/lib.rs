//! Configuration for the fanout push service.
//!
//! Values are layered: built-in defaults, `config/default.*`,
//! `config/{RUN_ENV}.*`, `FANOUT_`-prefixed environment variables and finally
//! the flat variables of earlier deployments (see [`env_vars`]).

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};

pub mod env_vars;
pub mod models;

pub use models::*;

use env_vars::{
    apply_legacy_env_overrides, get_config_prefix, inject_env_secrets, CONFIG_SEPARATOR,
    PREFIX_SEPARATOR,
};

/// Directory searched for configuration files when `FANOUT_CONFIG_DIR` is unset.
pub const DEFAULT_CONFIG_DIR: &str = "config";

static INIT_DOTENV: OnceCell<String> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// The file named by `DOTENV_OVERRIDE` is used if set, otherwise `.env`.
/// Loading happens at most once per process; a missing file is not an error.
/// Returns the path that was (or would have been) loaded.
pub fn ensure_dotenv_loaded() -> &'static str {
    INIT_DOTENV.get_or_init(|| {
        let dotenv_path =
            env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());
        dotenv::from_filename(&dotenv_path).ok();
        dotenv_path
    })
}

/// Loads the application configuration from the process environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = env::var("FANOUT_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

    let config = load_config_from(&config_dir, &run_env)?;
    Ok(apply_legacy_env_overrides(config, |key| env::var(key).ok()))
}

/// Loads configuration files from `config_dir` for the given `run_env`.
///
/// Both `default.*` and `{run_env}.*` are optional; any format supported by the
/// `config` crate is accepted.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, ConfigError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);

    tracing::debug!(
        "loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(
            Environment::with_prefix(&get_config_prefix())
                .prefix_separator(PREFIX_SEPARATOR)
                .separator(CONFIG_SEPARATOR)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.origins"),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Applies environment overrides based on `secret_from_env` markers in the config.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    if !inject_env_secrets(&mut json, &|key| env::var(key).ok()) {
        return Ok(config);
    }
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to apply env secrets: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let config = load_config_from(&fixtures_dir().join("does-not-exist"), "debug")
            .expect("defaults always load");
        assert_eq!(config.registry.max_registrations, 10_000);
        assert_eq!(config.delivery.inter_batch_delay_ms, 100);
        assert!(config.firebase.is_none());
        assert_eq!(config.cors.origins.len(), 4);
    }

    #[test]
    fn test_run_env_file_overrides_default_file() {
        let config = load_config_from(&fixtures_dir(), "test").expect("fixtures load");
        // default.toml sets the port, test.toml overrides it
        assert_eq!(config.server.port, 6100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.registry.max_registrations, 50);
        assert_eq!(config.delivery.inter_batch_delay_ms, 0);
        let firebase = config.firebase.expect("firebase section present");
        assert_eq!(firebase.project_id.as_deref(), Some("fanout-test"));
        assert_eq!(firebase.key_path, None);
    }
}
