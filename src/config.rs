//! Endpoint credentials and layered SDK settings.
//!
//! Two layers:
//! - [`Config`]: immutable Cloud API endpoint credentials; derives request URLs
//! - [`SdkConfig`]: the `config.toml` settings file used by the CLI
//!
//! Precedence for [`SdkConfig`]: env vars > credentials file > TOML file > defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::credentials::Credentials;
use crate::whatsapp::transport::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use crate::whatsapp::WhatsAppError;

/// Graph API root every endpoint URL is derived from.
pub const API_URL: &str = "https://graph.facebook.com/";

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v14.0";

/// Env var naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "WACLOUD_CONFIG_PATH";

/// Env var overriding the phone-number id.
pub const PHONE_NUMBER_ID_ENV: &str = "WHATSAPP_PHONE_NUMBER_ID";

/// Env var overriding the access token.
pub const ACCESS_TOKEN_ENV: &str = "WHATSAPP_ACCESS_TOKEN";

/// Env var overriding the API version.
pub const API_VERSION_ENV: &str = "WHATSAPP_API_VERSION";

/// Env var overriding the webhook verify token.
pub const VERIFY_TOKEN_ENV: &str = "WHATSAPP_VERIFY_TOKEN";

// ── Endpoint credentials ────────────────────────────────────────

/// Immutable Cloud API endpoint credentials.
///
/// Both the phone-number id and the access token are non-empty for every
/// constructed value. The token never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    phone_number_id: String,
    access_token: String,
    api_version: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl Config {
    /// Build endpoint credentials.
    ///
    /// An empty `api_version` falls back to [`DEFAULT_API_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Config`] when the phone-number id or the
    /// access token is empty.
    pub fn new(
        phone_number_id: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, WhatsAppError> {
        let phone_number_id = phone_number_id.into();
        let access_token = access_token.into();
        let api_version = api_version.into();

        if phone_number_id.trim().is_empty() || access_token.trim().is_empty() {
            return Err(WhatsAppError::Config(
                "phone_number_id and access_token are required".to_owned(),
            ));
        }

        let api_version = if api_version.trim().is_empty() {
            DEFAULT_API_VERSION.to_owned()
        } else {
            api_version
        };

        Ok(Self {
            phone_number_id,
            access_token,
            api_version,
        })
    }

    /// Build endpoint credentials on [`DEFAULT_API_VERSION`].
    ///
    /// # Errors
    ///
    /// Same as [`Config::new`].
    pub fn with_defaults(
        phone_number_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, WhatsAppError> {
        Self::new(phone_number_id, access_token, DEFAULT_API_VERSION)
    }

    /// The business phone-number id.
    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    /// The raw access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The Graph API version segment, e.g. `v14.0`.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// `API_URL + api_version + "/" + phone_number_id`.
    pub fn api_base_uri(&self) -> String {
        format!("{API_URL}{}/{}", self.api_version, self.phone_number_id)
    }

    /// Base URI with `suffix` appended verbatim.
    pub fn api_uri(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.api_base_uri())
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// ── Settings file ───────────────────────────────────────────────

/// Top-level settings loaded from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Endpoint credentials and webhook verify token.
    pub whatsapp: WhatsAppSettings,
    /// HTTP transport timeouts.
    pub http: HttpSettings,
    /// Log filter.
    pub logging: LoggingSettings,
}

/// `[whatsapp]` table.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppSettings {
    /// Business phone-number id.
    pub phone_number_id: String,
    /// Cloud API access token.
    pub access_token: String,
    /// Graph API version.
    pub api_version: String,
    /// Shared secret for the webhook subscription handshake.
    pub verify_token: Option<String>,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            phone_number_id: String::new(),
            access_token: String::new(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            verify_token: None,
        }
    }
}

impl fmt::Debug for WhatsAppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppSettings")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `[http]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl SdkConfig {
    /// Load settings: TOML file, then `credentials`, then the environment.
    ///
    /// An explicit `path` must exist. Without one, `$WACLOUD_CONFIG_PATH` or
    /// `~/.wacloud/config.toml` is tried and a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed.
    pub fn load(path: Option<&Path>, credentials: &Credentials) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let path = Self::config_path_with(|key| std::env::var(key).ok())?;
                if path.exists() {
                    Self::load_from_file(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| credentials.get(key).map(str::to_owned));
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read and parse one TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loading config from file");
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Parse a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Resolve the config file path using a custom env resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
        if let Some(p) = env(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(p));
        }
        Ok(config_dir()?.join("config.toml"))
    }

    /// Overlay values from `env` on top of the current settings.
    ///
    /// Takes a resolver so callers can layer a credentials file or test maps
    /// without touching the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env(PHONE_NUMBER_ID_ENV) {
            self.whatsapp.phone_number_id = v;
        }
        if let Some(v) = env(ACCESS_TOKEN_ENV) {
            self.whatsapp.access_token = v;
        }
        if let Some(v) = env(API_VERSION_ENV) {
            self.whatsapp.api_version = v;
        }
        if let Some(v) = env(VERIFY_TOKEN_ENV) {
            self.whatsapp.verify_token = Some(v);
        }
    }

    /// Endpoint credentials from the `[whatsapp]` table.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Config`] when the id or token is missing.
    pub fn endpoint(&self) -> Result<Config, WhatsAppError> {
        Config::new(
            self.whatsapp.phone_number_id.clone(),
            self.whatsapp.access_token.clone(),
            self.whatsapp.api_version.clone(),
        )
    }
}

/// Resolve the default config directory (`~/.wacloud/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".wacloud"))
}
