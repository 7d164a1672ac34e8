// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Loading [`ClientConfiguration`] from files.
//!
//! # Loading Pipeline
//!
//! 1. Read the file; pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders
//! 3. Parse YAML, TOML or JSON
//! 4. Apply environment variable overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UALINK_APPLICATION_NAME=Line4Logger
//! UALINK_ENDPOINT_URL=opc.tcp://10.0.0.5:4840
//! UALINK_USERNAME=operator
//! UALINK_PASSWORD=secret
//! UALINK_CERTIFICATE_STORE=/etc/ualink/pki
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{ClientConfiguration, UserCredentials};
use crate::error::{ConfigurationError, UaResult};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads client configuration files.
///
/// # Examples
///
/// ```no_run
/// use ualink_client::config::ConfigLoader;
///
/// let config = ConfigLoader::new().load("ualink.yaml").unwrap();
/// println!("{}", config.endpoint_url);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `UALINK` prefix and placeholder resolution on.
    pub fn new() -> Self {
        Self {
            env_prefix: "UALINK".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// `.yaml`/`.yml`, `.toml` and `.json` are recognised.
    pub fn load(&self, path: impl AsRef<Path>) -> UaResult<ClientConfiguration> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading client configuration");

        let format = ConfigFormat::from_path(path)?;
        let content = read_file(path)?;
        let config = self.load_from_str(&content, format)?;

        debug!(
            endpoint = %config.endpoint_url,
            application = %config.application_name,
            anonymous = config.user_identity.is_none(),
            "Client configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> UaResult<ClientConfiguration> {
        let mut config: ClientConfiguration = if self.resolve_env_vars {
            parse_str(&resolve_env_placeholders(content)?, format)?
        } else {
            parse_str(content, format)?
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config);
        }

        config.validate()?;
        Ok(config)
    }

    fn env_var(&self, key: &str) -> Option<String> {
        env::var(format!("{}_{}", self.env_prefix, key)).ok()
    }

    fn apply_env_overrides(&self, config: &mut ClientConfiguration) {
        if let Some(value) = self.env_var("APPLICATION_NAME") {
            config.application_name = value;
        }
        if let Some(value) = self.env_var("ENDPOINT_URL") {
            config.endpoint_url = value;
        }
        if let Some(username) = self.env_var("USERNAME") {
            let password = self
                .env_var("PASSWORD")
                .or_else(|| config.user_identity.as_ref().map(|c| c.password.clone()))
                .unwrap_or_default();
            config.user_identity = Some(UserCredentials::new(username, password));
        } else if let (Some(password), Some(credentials)) =
            (self.env_var("PASSWORD"), config.user_identity.as_mut())
        {
            credentials.password = password;
        }
        if let Some(value) = self.env_var("CERTIFICATE_STORE") {
            config.certificate_store = Some(PathBuf::from(value));
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable handling.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(enabled) = self.resolve_env_vars {
            loader.resolve_env_vars = enabled;
        }
        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> UaResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(ConfigurationError::UnsupportedFormat {
                extension: other.to_string(),
            }
            .into()),
            None => Err(ConfigurationError::UnsupportedFormat {
                extension: "(no extension)".to_string(),
            }
            .into()),
        }
    }

    /// Returns the format name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn read_file(path: &Path) -> UaResult<String> {
    if !path.exists() {
        return Err(ConfigurationError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::read_to_string(path)
        .map_err(|e| ConfigurationError::parse("file", format!("{}: {e}", path.display())).into())
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> UaResult<T> {
    let name = format.name();
    let parsed = match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ConfigurationError::parse(name, message).into())
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| e.to_string())
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
///
/// An unset variable without a default is an error. An unterminated `${` is
/// copied through unchanged.
fn resolve_env_placeholders(content: &str) -> UaResult<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return Ok(result);
        };

        let body = &after[..end];
        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };

        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                return Err(ConfigurationError::EnvVarNotFound {
                    name: name.to_string(),
                }
                .into())
            }
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UaError;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
application_name: Line 4 Logger
endpoint_url: opc.tcp://10.0.0.5:4840
user_identity:
  username: operator
  password: secret
subscription:
  publishing_interval: 250ms
  max_keep_alive_count: 5
  lifetime_count: 15
"#;

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("UALINK_TEST_YAML")
            .load(file.path())
            .unwrap();

        assert_eq!(config.application_name, "Line 4 Logger");
        assert_eq!(config.endpoint_url, "opc.tcp://10.0.0.5:4840");
        assert_eq!(config.subscription.publishing_interval, Duration::from_millis(250));
        assert_eq!(config.subscription.lifetime_count, 15);
        assert!(config.subscription.publishing_enabled);
        assert!(!config.identity().is_anonymous());
    }

    #[test]
    fn test_load_toml_defaults() {
        let toml = "endpoint_url = \"opc.tcp://plc:4840\"\n";
        let config = ConfigLoader::new()
            .with_env_prefix("UALINK_TEST_TOML")
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();

        assert_eq!(config.application_name, "OPCClient");
        assert!(config.identity().is_anonymous());
        assert_eq!(config.subscription.publishing_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_load_json_with_certificate_store() {
        let json = r#"{"endpoint_url": "opc.tcp://plc:4840", "certificate_store": "/etc/pki"}"#;
        let config = ConfigLoader::new()
            .with_env_prefix("UALINK_TEST_JSON")
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();

        assert_eq!(config.certificate_store, Some(PathBuf::from("/etc/pki")));
    }

    #[test]
    fn test_placeholders_with_defaults() {
        env::set_var("UALINK_TEST_PLACEHOLDER_HOST", "192.168.1.9");
        let content = "endpoint_url = \"opc.tcp://${UALINK_TEST_PLACEHOLDER_HOST}:${UALINK_TEST_PLACEHOLDER_PORT:4841}\"";

        let config = ConfigLoader::new()
            .with_env_prefix("UALINK_TEST_PH")
            .load_from_str(content, ConfigFormat::Toml)
            .unwrap();

        assert_eq!(config.endpoint_url, "opc.tcp://192.168.1.9:4841");
    }

    #[test]
    fn test_missing_placeholder_is_error() {
        let result = resolve_env_placeholders("x = \"${UALINK_TEST_DEFINITELY_UNSET}\"");
        assert!(matches!(
            result,
            Err(UaError::Configuration(ConfigurationError::EnvVarNotFound { .. }))
        ));

        assert_eq!(resolve_env_placeholders("a ${open").unwrap(), "a ${open");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("UALINK_TEST_OVR_ENDPOINT_URL", "opc.tcp://override:4840");
        env::set_var("UALINK_TEST_OVR_USERNAME", "maint");
        env::set_var("UALINK_TEST_OVR_PASSWORD", "pw");

        let config = ConfigLoader::builder()
            .env_prefix("UALINK_TEST_OVR")
            .build()
            .load_from_str("endpoint_url = \"opc.tcp://plc:4840\"", ConfigFormat::Toml)
            .unwrap();

        assert_eq!(config.endpoint_url, "opc.tcp://override:4840");
        assert_eq!(
            config.user_identity,
            Some(UserCredentials::new("maint", "pw"))
        );
    }

    #[test]
    fn test_invalid_endpoint_fails_validation() {
        let result = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str("endpoint_url = \"http://plc\"", ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(UaError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().load("/nonexistent/ualink.yaml");
        assert!(matches!(
            result,
            Err(UaError::Configuration(ConfigurationError::FileNotFound { .. }))
        ));
    }
}
