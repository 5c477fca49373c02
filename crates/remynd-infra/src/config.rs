//! Configuration loader for Remynd.
//!
//! Reads `config.toml` from the data directory (`~/.remynd/` in production)
//! and deserializes it into [`RemyndConfig`]. Falls back to sensible
//! defaults when the file is missing or malformed. Secrets come from the
//! environment, never from the file.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use remynd_types::config::RemyndConfig;

/// Environment variable holding the chat-completions API key.
pub const LLM_API_KEY_ENV: &str = "REMYND_LLM_API_KEY";

/// Environment variable holding the Twilio auth token.
pub const TWILIO_AUTH_TOKEN_ENV: &str = "TWILIO_AUTH_TOKEN";

/// Resolve the data directory from `REMYND_DATA_DIR`, falling back to
/// `~/.remynd`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("REMYND_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".remynd")
        }
    }
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RemyndConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> RemyndConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RemyndConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RemyndConfig::default();
        }
    };

    match toml::from_str::<RemyndConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RemyndConfig::default()
        }
    }
}

/// Read a secret from the environment, wrapped so it never hits logs.
pub fn secret_from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
