//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keyring service under which the engine API token is stored.
pub const KEYRING_SERVICE: &str = "entry-bridge";

/// Environment variable consulted when the keychain has no token.
pub const API_TOKEN_ENV: &str = "ENTRY_BRIDGE_API_TOKEN";

/// Connection settings for the remote data-entry engine.
///
/// The API token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Base URL of the engine's HTTP API, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// Application (entry program) loaded into every new session.
    pub application: String,
    /// Upper bound for a single engine request.
    #[serde(default = "default_request_seconds")]
    pub request_seconds: u64,
    /// Bearer token for the engine API (populated at runtime).
    #[serde(skip)]
    pub api_token: Option<String>,
}

/// Configurable timeout values (seconds) for interactive waits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Presenter wait before the conservative default is applied.
    #[serde(default = "default_presenter_seconds")]
    pub presenter_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            presenter_seconds: default_presenter_seconds(),
        }
    }
}

/// Entry behaviour settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EntryConfig {
    /// Operator identifier passed to the engine when entry starts.
    #[serde(default)]
    pub operator_id: Option<String>,
}

fn default_request_seconds() -> u64 {
    30
}

fn default_presenter_seconds() -> u64 {
    30
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Engine connectivity settings.
    pub engine: EngineConfig,
    /// Timeout configuration for interactive waits.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Entry behaviour settings.
    #[serde(default)]
    pub entry: EntryConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the engine API token from OS keychain with env-var fallback.
    ///
    /// A missing token is not an error: the engine may run without
    /// authentication. The absence is logged.
    pub async fn load_credentials(&mut self) {
        self.engine.api_token = load_credential("engine_api_token", API_TOKEN_ENV).await;
        if self.engine.api_token.is_none() {
            warn!("no engine api token configured; requests are unauthenticated");
        }
    }

    /// Upper bound for a single engine request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.request_seconds)
    }

    /// Presenter wait window.
    #[must_use]
    pub fn presenter_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.presenter_seconds)
    }

    fn validate(&mut self) -> Result<()> {
        let url = self.engine.base_url.trim().trim_end_matches('/').to_owned();
        if url.is_empty() {
            return Err(AppError::Config("engine.base_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(
                "engine.base_url must use http or https".into(),
            ));
        }
        self.engine.base_url = url;

        if self.engine.application.trim().is_empty() {
            return Err(AppError::Config(
                "engine.application must not be empty".into(),
            ));
        }

        if self.engine.request_seconds == 0 {
            return Err(AppError::Config(
                "engine.request_seconds must be greater than zero".into(),
            ));
        }

        if self.timeouts.presenter_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.presenter_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Option<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await;

    match keychain_result {
        Ok(Ok(value)) if !value.is_empty() => return Some(value),
        Ok(Ok(_)) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Ok(Err(err)) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
        Err(err) => {
            warn!(key = keyring_key, %err, "keychain task panicked, trying env var");
        }
    }

    env::var(env_key).ok().filter(|value| !value.is_empty())
}
