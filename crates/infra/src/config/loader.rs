//! Configuration loader
//!
//! Builds an [`ApiClientConfig`] from environment variables or a TOML file.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//!
//! ## Environment Variables
//! - `MULTIVERS_CLIENT_ID`: OAuth client ID (required)
//! - `MULTIVERS_CLIENT_SECRET`: OAuth client secret (required)
//! - `MULTIVERS_REDIRECT_URI`: Registered redirect URI (required)
//! - `MULTIVERS_PLATFORM`: `multivers` (default) or `boekhoudgemak`
//! - `MULTIVERS_API_VERSION`: Versioned path segment, default 21
//! - `MULTIVERS_SANDBOX`: Use the sandbox host (true/false)
//! - `MULTIVERS_DATABASE`: Administration database
//! - `MULTIVERS_BASE_URI`: Fixed base URI, overrides platform/version/sandbox
//! - `MULTIVERS_TIMEOUT_SECS`: Request timeout in seconds
//! - `MULTIVERS_ACCEPT_INVALID_CERTS`: Disable TLS verification (true/false)
//! - `MULTIVERS_USER_AGENT`: `User-Agent` header
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./multivers.toml` (current working directory)
//! 2. `../multivers.toml` (parent directory)
//! 3. `multivers.toml` next to the executable
//!
//! The file uses the same settings as snake_case keys without the prefix
//! (`client_id`, `sandbox`, `timeout_secs`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use multivers_common::auth::OAuthConfig;
use multivers_common::endpoint::{ApiTarget, FixedBaseUri};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::api::{ApiClientConfig, ApiError};

/// Name of the configuration file probed by [`probe_config_paths`]
pub const CONFIG_FILE_NAME: &str = "multivers.toml";

const ENV_PREFIX: &str = "MULTIVERS_";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("unknown platform '{0}', expected 'multivers' or 'boekhoudgemak'")]
    UnknownPlatform(String),

    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("no multivers.toml found in any of the standard locations")]
    NoConfigFile,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML format: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Settings as they appear in the environment or the TOML file, before
/// validation
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    platform: Option<String>,
    api_version: Option<u32>,
    sandbox: Option<bool>,
    database: Option<String>,
    base_uri: Option<String>,
    timeout_secs: Option<u64>,
    accept_invalid_certs: Option<bool>,
    user_agent: Option<String>,
}

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If a required
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns [`ConfigError`] if configuration cannot be loaded from either
/// source or a value is invalid
pub fn load() -> Result<ApiClientConfig, ConfigError> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(ConfigError::Missing(key)) => {
            tracing::debug!(missing = %key, "Environment incomplete, trying file");
            load_from_file(None)
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns [`ConfigError`] if required variables are missing or have
/// invalid values
pub fn load_from_env() -> Result<ApiClientConfig, ConfigError> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary `MULTIVERS_*` variable lookup
///
/// # Errors
/// Returns [`ConfigError`] if required variables are missing or have
/// invalid values
pub fn load_from_lookup<F>(lookup: F) -> Result<ApiClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("{ENV_PREFIX}{name}")).filter(|value| !value.trim().is_empty())
    };

    let settings = RawSettings {
        client_id: var("CLIENT_ID"),
        client_secret: var("CLIENT_SECRET"),
        redirect_uri: var("REDIRECT_URI"),
        platform: var("PLATFORM"),
        api_version: var("API_VERSION")
            .map(|v| parse_number("MULTIVERS_API_VERSION", &v))
            .transpose()?,
        sandbox: var("SANDBOX").map(|v| parse_bool("MULTIVERS_SANDBOX", &v)).transpose()?,
        database: var("DATABASE"),
        base_uri: var("BASE_URI"),
        timeout_secs: var("TIMEOUT_SECS")
            .map(|v| parse_number("MULTIVERS_TIMEOUT_SECS", &v))
            .transpose()?,
        accept_invalid_certs: var("ACCEPT_INVALID_CERTS")
            .map(|v| parse_bool("MULTIVERS_ACCEPT_INVALID_CERTS", &v))
            .transpose()?,
        user_agent: var("USER_AGENT"),
    };

    settings.into_config(|name| format!("{ENV_PREFIX}{}", name.to_ascii_uppercase()))
}

/// Load configuration from a TOML file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns [`ConfigError`] if no file is found, it cannot be read or
/// parsed, or a value is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ApiClientConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::FileNotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(ConfigError::NoConfigFile)?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)?;
    parse_config(&contents)
}

/// Parse configuration from TOML content
///
/// # Errors
/// Returns [`ConfigError`] if the TOML is invalid or a value is invalid
pub fn parse_config(contents: &str) -> Result<ApiClientConfig, ConfigError> {
    let settings: RawSettings = toml::from_str(contents)?;
    settings.into_config(str::to_string)
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter().find_map(|dir| probe_dir(dir))
}

fn probe_dir(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.exists().then_some(candidate)
}

impl RawSettings {
    /// Validate and assemble; `key_name` renders a field name the way the
    /// source spells it, for error messages
    fn into_config<K>(self, key_name: K) -> Result<ApiClientConfig, ConfigError>
    where
        K: Fn(&str) -> String,
    {
        let required = |value: Option<String>, field: &str| {
            value.ok_or_else(|| ConfigError::Missing(key_name(field)))
        };

        let client_id = required(self.client_id, "client_id")?;
        let client_secret = required(self.client_secret, "client_secret")?;
        let redirect_uri = required(self.redirect_uri, "redirect_uri")?;

        let oauth = match self.base_uri {
            Some(base_uri) => {
                let parsed = Url::parse(&base_uri).map_err(|e| ConfigError::Invalid {
                    key: key_name("base_uri"),
                    message: e.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid {
                        key: key_name("base_uri"),
                        message: format!("unsupported scheme '{}'", parsed.scheme()),
                    });
                }
                OAuthConfig::new(client_id, client_secret, redirect_uri, FixedBaseUri::new(base_uri))
            }
            None => {
                let target = match self.platform.as_deref() {
                    Some(name) => ApiTarget::from_name(name)
                        .ok_or_else(|| ConfigError::UnknownPlatform(name.to_string()))?,
                    None => ApiTarget::MULTIVERS,
                };
                OAuthConfig::new(client_id, client_secret, redirect_uri, target)
            }
        };

        let mut oauth = oauth.with_sandbox(self.sandbox.unwrap_or(false));
        if let Some(version) = self.api_version {
            oauth = oauth.with_version(version);
        }

        let mut config = ApiClientConfig::new(oauth);
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.accept_invalid_certs = self.accept_invalid_certs.unwrap_or(false);
        config.user_agent = self.user_agent;
        config.database = self.database;

        if config.accept_invalid_certs {
            tracing::warn!("configuration disables TLS certificate verification");
        }

        Ok(config)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Parse boolean from a variable value
///
/// Accepts `1`, `true`, `yes`, `on` and `0`, `false`, `no`, `off`
/// (case-insensitive); anything else is [`ConfigError::Invalid`].
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected a boolean, got `{other}`"),
        }),
    }
}
