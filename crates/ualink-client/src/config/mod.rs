// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration.
//!
//! [`ClientConfiguration`] is handed to the client once at construction and
//! never changes afterwards. It can be built in code, through
//! [`ClientConfigurationBuilder`], or loaded from a file with [`ConfigLoader`].
//!
//! # Examples
//!
//! ```
//! use ualink_client::config::ClientConfiguration;
//!
//! let config = ClientConfiguration::builder()
//!     .application_name("Line 4 Logger")
//!     .endpoint_url("opc.tcp://192.168.0.20:4840")
//!     .username("operator", "secret")
//!     .build()
//!     .unwrap();
//!
//! assert!(!config.identity().is_anonymous());
//! ```

mod loader;

pub use loader::{ConfigFormat, ConfigLoader, ConfigLoaderBuilder};

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, UaResult};
use crate::types::UserIdentity;

/// Application name used when none is configured.
pub const DEFAULT_APPLICATION_NAME: &str = "OPCClient";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4840;

/// URL scheme accepted for endpoints.
pub const ENDPOINT_SCHEME: &str = "opc.tcp://";

// =============================================================================
// ClientConfiguration
// =============================================================================

/// Settings a client is initialized with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfiguration {
    /// Name the client presents to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Server endpoint, `opc.tcp://host:port`.
    pub endpoint_url: String,

    /// Username credentials. Absent means anonymous.
    #[serde(default)]
    pub user_identity: Option<UserCredentials>,

    /// Certificate store for secured endpoints.
    #[serde(default)]
    pub certificate_store: Option<PathBuf>,

    /// Defaults applied to subscription requests built from this configuration.
    #[serde(default)]
    pub subscription: SubscriptionSettings,
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

impl ClientConfiguration {
    /// Creates a builder.
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }

    /// Anonymous configuration for a server on the default port of `host`.
    pub fn for_host(host: &str) -> Self {
        Self {
            application_name: default_application_name(),
            endpoint_url: format!("{ENDPOINT_SCHEME}{host}:{DEFAULT_PORT}"),
            user_identity: None,
            certificate_store: None,
            subscription: SubscriptionSettings::default(),
        }
    }

    /// Resolves the session identity.
    pub fn identity(&self) -> UserIdentity {
        match &self.user_identity {
            Some(credentials) => UserIdentity::UserName {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            },
            None => UserIdentity::Anonymous,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> UaResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigurationError::missing_field("application_name").into());
        }

        validate_endpoint_url(&self.endpoint_url)?;

        if let Some(credentials) = &self.user_identity {
            if credentials.username.is_empty() {
                return Err(ConfigurationError::missing_field("user_identity.username").into());
            }
        }

        if let Some(store) = &self.certificate_store {
            if store.as_os_str().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "certificate_store",
                    "path must not be empty",
                )
                .into());
            }
        }

        Ok(())
    }
}

/// Checks that `url` is `opc.tcp://` followed by a host.
pub fn validate_endpoint_url(url: &str) -> UaResult<()> {
    if url.is_empty() {
        return Err(ConfigurationError::missing_field("endpoint_url").into());
    }

    let rest = url.strip_prefix(ENDPOINT_SCHEME).ok_or_else(|| {
        ConfigurationError::invalid_endpoint(url, format!("must start with {ENDPOINT_SCHEME}"))
    })?;

    let authority = rest.split('/').next().unwrap_or_default();
    let host = match authority.rsplit_once(':') {
        Some((host, port)) => {
            port.parse::<u16>().map_err(|_| {
                ConfigurationError::invalid_endpoint(url, format!("invalid port '{port}'"))
            })?;
            host
        }
        None => authority,
    };

    if host.is_empty() {
        return Err(ConfigurationError::invalid_endpoint(url, "missing host").into());
    }

    Ok(())
}

// =============================================================================
// UserCredentials
// =============================================================================

/// Username and password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    /// User name.
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

impl UserCredentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// ClientConfigurationBuilder
// =============================================================================

/// Builder for [`ClientConfiguration`].
#[derive(Debug, Default)]
pub struct ClientConfigurationBuilder {
    application_name: Option<String>,
    endpoint_url: Option<String>,
    user_identity: Option<UserCredentials>,
    certificate_store: Option<PathBuf>,
    subscription: Option<SubscriptionSettings>,
}

impl ClientConfigurationBuilder {
    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the endpoint URL.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Uses username/password authentication.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_identity = Some(UserCredentials::new(username, password));
        self
    }

    /// Uses anonymous authentication.
    pub fn anonymous(mut self) -> Self {
        self.user_identity = None;
        self
    }

    /// Sets the certificate store path.
    pub fn certificate_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_store = Some(path.into());
        self
    }

    /// Sets subscription defaults.
    pub fn subscription(mut self, settings: SubscriptionSettings) -> Self {
        self.subscription = Some(settings);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> UaResult<ClientConfiguration> {
        let config = ClientConfiguration {
            application_name: self.application_name.unwrap_or_else(default_application_name),
            endpoint_url: self
                .endpoint_url
                .ok_or_else(|| ConfigurationError::missing_field("endpoint_url"))?,
            user_identity: self.user_identity,
            certificate_store: self.certificate_store,
            subscription: self.subscription.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// SubscriptionSettings
// =============================================================================

/// Parameters requested when a subscription is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Requested publishing interval.
    #[serde(default = "default_publishing_interval", with = "humantime_serde")]
    pub publishing_interval: Duration,

    /// Publishing intervals without notifications before a keep-alive is sent.
    #[serde(default = "default_max_keep_alive_count")]
    pub max_keep_alive_count: u32,

    /// Publishing intervals without a publish request before the subscription expires.
    #[serde(default = "default_lifetime_count")]
    pub lifetime_count: u32,

    /// Whether publishing starts enabled.
    #[serde(default = "default_true")]
    pub publishing_enabled: bool,
}

fn default_publishing_interval() -> Duration {
    Duration::from_millis(10)
}

fn default_max_keep_alive_count() -> u32 {
    10
}

fn default_lifetime_count() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            publishing_interval: default_publishing_interval(),
            max_keep_alive_count: default_max_keep_alive_count(),
            lifetime_count: default_lifetime_count(),
            publishing_enabled: true,
        }
    }
}

impl SubscriptionSettings {
    /// Creates settings with a custom publishing interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            publishing_interval: interval,
            ..Default::default()
        }
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
