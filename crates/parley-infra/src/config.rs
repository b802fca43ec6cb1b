//! Configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` by default) and
//! deserializes it into [`AppConfig`]. Falls back to defaults when the file
//! is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use parley_types::config::AppConfig;
use secrecy::SecretString;

pub const ENV_DATA_DIR: &str = "PARLEY_DATA_DIR";
pub const ENV_TURN_ENDPOINT: &str = "PARLEY_TURN_ENDPOINT";
pub const ENV_TURN_API_KEY: &str = "PARLEY_TURN_API_KEY";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
/// 3. `./.parley`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }

    PathBuf::from(".parley")
}

/// Load configuration from `{data_dir}/config.toml` plus environment overrides.
///
/// - If the file does not exist, starts from [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and starts from the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config = read_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    mut config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    if let Some(endpoint) = lookup(ENV_TURN_ENDPOINT).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(endpoint = %endpoint, "turn endpoint overridden from environment");
        config.turn.endpoint = Some(endpoint);
    }
    config
}

/// API key for the turn endpoint, if one is configured.
pub fn turn_api_key() -> Option<SecretString> {
    std::env::var(ENV_TURN_API_KEY)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
