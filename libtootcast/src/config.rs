//! Configuration document for Tootcast
//!
//! The document is a hand-editable TOML file with four sections:
//!
//! ```toml
//! [application]
//! client_id = "12345"
//!
//! [instance]
//! base_url = "https://example.social/"
//! client_key = "..."
//! client_secret = "..."
//!
//! [user]
//! username = "me@example.com"
//! access_token = "..."
//!
//! [defaults]
//! visibility = "unlisted"
//! language = "en"
//! fetch_limit = 20
//! ```
//!
//! It is the only owner of credential state. Only `instance.base_url` has to be
//! written by hand; everything else is filled in by the bootstrap sequence.
//!
//! Keys and tables this crate does not know about are kept in each section's
//! `extra` table and written back on every save. Comments are not kept.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Visibility;

/// Application name, used for the config directory, OAuth registration and user agent
pub const APPLICATION_NAME: &str = "tootcast";

/// File name of the configuration document inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "TOOTCAST_CONFIG_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "ApplicationSection::is_empty")]
    pub application: ApplicationSection,

    #[serde(default, skip_serializing_if = "InstanceSection::is_empty")]
    pub instance: InstanceSection,

    #[serde(default, skip_serializing_if = "UserSection::is_empty")]
    pub user: UserSection,

    #[serde(default, skip_serializing_if = "DefaultsSection::is_empty")]
    pub defaults: DefaultsSection,

    /// Keys and tables this crate does not interpret, written back unchanged
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSection {
    /// Identifier the instance assigned to the registered application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    /// Login name used for the password grant; optional, can be given per run instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Defaults applied to status operations when the caller does not override them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_limit: Option<u32>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl ApplicationSection {
    fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.extra.is_empty()
    }
}

impl InstanceSection {
    fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.client_key.is_none()
            && self.client_secret.is_none()
            && self.extra.is_empty()
    }
}

impl UserSection {
    fn is_empty(&self) -> bool {
        self.username.is_none() && self.access_token.is_none() && self.extra.is_empty()
    }
}

impl DefaultsSection {
    fn is_empty(&self) -> bool {
        self.visibility.is_none()
            && self.language.is_none()
            && self.fetch_limit.is_none()
            && self.extra.is_empty()
    }
}

impl fmt::Debug for InstanceSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSection")
            .field("base_url", &self.base_url)
            .field("client_key", &self.client_key)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Debug for UserSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSection")
            .field("username", &self.username)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigDocument {
    /// Create a document holding only the instance URL
    pub fn with_base_url(base_url: &Url) -> Self {
        Self {
            instance: InstanceSection {
                base_url: Some(base_url.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Trim all string values and treat blank ones as absent
    pub fn normalized(mut self) -> Self {
        normalize(&mut self.application.client_id);
        normalize(&mut self.instance.base_url);
        normalize(&mut self.instance.client_key);
        normalize(&mut self.instance.client_secret);
        normalize(&mut self.user.username);
        normalize(&mut self.user.access_token);
        normalize(&mut self.defaults.language);
        self
    }

    /// Check the structural credential invariants
    ///
    /// `client_key` and `client_secret` must be both present or both absent, and an
    /// `access_token` requires both of them. The instance URL is not checked here; a
    /// missing URL is a state the session layer reports, not a corrupt document.
    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        match (&self.instance.client_key, &self.instance.client_secret) {
            (Some(_), None) => {
                return Err(invalid(
                    "instance.client_key is set but instance.client_secret is missing",
                ))
            }
            (None, Some(_)) => {
                return Err(invalid(
                    "instance.client_secret is set but instance.client_key is missing",
                ))
            }
            _ => {}
        }

        if self.user.access_token.is_some() && !self.has_app_credentials() {
            return Err(invalid(
                "user.access_token is set but the application credentials \
                 (instance.client_key, instance.client_secret) are missing",
            ));
        }

        Ok(())
    }

    /// Parse and check the instance URL
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .instance
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::NoInstance {
                reason: "instance.base_url is not set; add the URL of your instance to the config file"
                    .to_string(),
            })?;

        let url = Url::parse(raw).map_err(|e| ConfigError::NoInstance {
            reason: format!("instance.base_url '{}' is not a valid URL: {}", raw, e),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::NoInstance {
                reason: format!("instance.base_url '{}' must be an http(s) URL with a host", raw),
            });
        }

        Ok(url)
    }

    /// Both halves of the application credentials are present
    pub fn has_app_credentials(&self) -> bool {
        self.instance.client_key.is_some() && self.instance.client_secret.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user.access_token.as_deref()
    }
}

fn normalize(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

/// Resolve the configuration directory
///
/// Precedence: explicit override, then `TOOTCAST_CONFIG_DIR`, then the platform config
/// directory (`~/.config/tootcast` on Linux).
pub fn resolve_config_dir(dir_override: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = dir_override {
        return Ok(dir.to_path_buf());
    }

    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(&dir).to_string()));
        }
    }

    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APPLICATION_NAME))
}
