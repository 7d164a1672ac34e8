// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! - `test_load_*`: file formats and placeholders
//! - `test_override_*`: environment overrides
//! - `test_validate_*`: validation rules
//!
//! Every test that sets environment variables uses its own prefix.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ualink_client::{
    ClientConfiguration, ConfigFormat, ConfigLoader, ConfigurationError, OpcClient, UaError,
};
use ualink_tests::prelude::*;
use ualink_tests::common::temp_test_dir;

const YAML: &str = r#"
application_name: Line4Logger
endpoint_url: opc.tcp://10.0.0.5:4840
user_identity:
  username: operator
  password: secret
subscription:
  publishing_interval: 250ms
  max_keep_alive_count: 5
  lifetime_count: 15
"#;

const TOML: &str = r#"
application_name = "Line4Logger"
endpoint_url = "opc.tcp://10.0.0.5:4840"

[subscription]
publishing_interval = "1s"
"#;

const JSON: &str = r#"{
    "endpoint_url": "opc.tcp://10.0.0.5:4840",
    "certificate_store": "/etc/ualink/pki"
}"#;

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_file() {
    init_test_logging();
    let dir = temp_test_dir("ualink-config");
    let path = dir.path().join("client.yaml");
    fs::write(&path, YAML).expect("write config");

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_YAML")
        .load(&path)
        .expect("valid config");

    assert_eq!(config.application_name, "Line4Logger");
    assert_eq!(config.endpoint_url, "opc.tcp://10.0.0.5:4840");
    let credentials = config.user_identity.as_ref().expect("identity");
    assert_eq!(credentials.username, "operator");
    assert_eq!(config.subscription.publishing_interval, Duration::from_millis(250));
    assert_eq!(config.subscription.max_keep_alive_count, 5);
    assert_eq!(config.subscription.lifetime_count, 15);
    assert!(!config.identity().is_anonymous());
}

#[test]
fn test_load_toml_file_with_defaults() {
    let dir = temp_test_dir("ualink-config");
    let path = dir.path().join("client.toml");
    fs::write(&path, TOML).expect("write config");

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_TOML")
        .load(&path)
        .expect("valid config");

    assert_eq!(config.subscription.publishing_interval, Duration::from_secs(1));
    assert_eq!(config.subscription.max_keep_alive_count, 10);
    assert_eq!(config.subscription.lifetime_count, 30);
    assert!(config.subscription.publishing_enabled);
    assert!(config.user_identity.is_none());
}

#[test]
fn test_load_json_file() {
    let dir = temp_test_dir("ualink-config");
    let path = dir.path().join("client.json");
    fs::write(&path, JSON).expect("write config");

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_JSON")
        .load(&path)
        .expect("valid config");

    assert_eq!(config.application_name, "OPCClient");
    assert_eq!(config.certificate_store, Some(PathBuf::from("/etc/ualink/pki")));
}

#[test]
fn test_load_missing_file() {
    let dir = temp_test_dir("ualink-config");
    let result = ConfigLoader::new().load(dir.path().join("absent.yaml"));

    assert!(matches!(
        result,
        Err(UaError::Configuration(ConfigurationError::FileNotFound { .. }))
    ));
}

#[test]
fn test_load_unsupported_extension() {
    let dir = temp_test_dir("ualink-config");
    let path = dir.path().join("client.ini");
    fs::write(&path, "endpoint_url=x").expect("write config");

    let result = ConfigLoader::new().load(&path);
    assert!(matches!(
        result,
        Err(UaError::Configuration(ConfigurationError::UnsupportedFormat { .. }))
    ));
}

#[test]
fn test_load_placeholder_default() {
    let content = r#"{ "endpoint_url": "opc.tcp://${UALINK_IT_PLACEHOLDER_HOST:192.168.0.20}:4840" }"#;

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_PLACEHOLDER")
        .load_from_str(content, ConfigFormat::Json)
        .expect("valid config");

    assert_eq!(config.endpoint_url, "opc.tcp://192.168.0.20:4840");
}

#[test]
fn test_load_placeholder_from_environment() {
    std::env::set_var("UALINK_IT_PLACEHOLDER_SET_HOST", "plc-7");
    let content = r#"endpoint_url = "opc.tcp://${UALINK_IT_PLACEHOLDER_SET_HOST}:4840""#;

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_PLACEHOLDER_SET")
        .load_from_str(content, ConfigFormat::Toml)
        .expect("valid config");

    assert_eq!(config.endpoint_url, "opc.tcp://plc-7:4840");
}

#[test]
fn test_load_placeholder_unset_without_default() {
    let content = r#"endpoint_url = "opc.tcp://${UALINK_IT_NEVER_SET_HOST}:4840""#;

    let result = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_UNSET")
        .load_from_str(content, ConfigFormat::Toml);

    assert!(matches!(
        result,
        Err(UaError::Configuration(ConfigurationError::EnvVarNotFound { .. }))
    ));
}

#[test]
fn test_load_parse_error() {
    let result = ConfigLoader::new().load_from_str("{ not json", ConfigFormat::Json);
    assert!(matches!(
        result,
        Err(UaError::Configuration(ConfigurationError::Parse { format: "JSON", .. }))
    ));
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn test_override_endpoint_and_identity() {
    std::env::set_var("UALINK_IT_OVR_ENDPOINT_URL", "opc.tcp://override:4841");
    std::env::set_var("UALINK_IT_OVR_USERNAME", "maintenance");
    std::env::set_var("UALINK_IT_OVR_PASSWORD", "hunter2");

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_OVR")
        .load_from_str(TOML, ConfigFormat::Toml)
        .expect("valid config");

    assert_eq!(config.endpoint_url, "opc.tcp://override:4841");
    let credentials = config.user_identity.expect("identity");
    assert_eq!(credentials.username, "maintenance");
    assert_eq!(credentials.password, "hunter2");
}

#[test]
fn test_override_disabled() {
    std::env::set_var("UALINK_IT_OFF_ENDPOINT_URL", "opc.tcp://ignored:4840");

    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_OFF")
        .with_env_vars(false)
        .load_from_str(TOML, ConfigFormat::Toml)
        .expect("valid config");

    assert_eq!(config.endpoint_url, "opc.tcp://10.0.0.5:4840");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_rejects_wrong_scheme() {
    let result = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_SCHEME")
        .load_from_str(r#"{ "endpoint_url": "http://10.0.0.5:4840" }"#, ConfigFormat::Json);

    assert!(matches!(
        result,
        Err(UaError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
    ));
}

#[test]
fn test_validate_keeps_subscription_counts_as_written() {
    let content = r#"
endpoint_url = "opc.tcp://10.0.0.5:4840"

[subscription]
publishing_interval = "0s"
max_keep_alive_count = 20
lifetime_count = 30
"#;
    let config = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_LIFETIME")
        .load_from_str(content, ConfigFormat::Toml)
        .expect("valid config");

    assert!(config.subscription.publishing_interval.is_zero());
    assert_eq!(config.subscription.max_keep_alive_count, 20);
    assert_eq!(config.subscription.lifetime_count, 30);
}

#[test]
fn test_validate_builder_requires_endpoint() {
    let result = ClientConfiguration::builder().application_name("x").build();
    assert_configuration_error(result);
}

#[test]
fn test_validate_client_rejects_invalid_configuration() {
    let mut config = ConfigFixtures::anonymous();
    config.application_name = "  ".into();

    let result = OpcClient::new(config, SimulatedStack::shared());
    assert_configuration_error(result);
}

#[test]
fn test_validate_config_round_trips_through_json() {
    let config = ConfigFixtures::with_user("operator", "secret");
    let json = serde_json::to_string(&config).expect("serialize");
    let parsed = ConfigLoader::new()
        .with_env_prefix("UALINK_IT_ROUND")
        .load_from_str(&json, ConfigFormat::Json)
        .expect("valid config");

    assert_eq!(parsed.endpoint_url, config.endpoint_url);
    assert_eq!(parsed.subscription, config.subscription);
}
