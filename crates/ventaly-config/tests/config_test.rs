#![allow(clippy::unwrap_used)]
// Persistence tests for `ventaly-config` against temporary files.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ventaly_config::{Config, ConfigError, Profile, load_config_from, save_config_to};

#[test]
fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("config.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.scan_interval, 10);
    assert_eq!(config.defaults.timeout, 10);
    assert_eq!(config.defaults.retries, 5);
    assert_eq!(config.defaults.retry_delay_ms, 500);
    assert!(config.profiles.is_empty());
}

#[test]
fn test_detected_dialect_survives_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set_host("living-room", "192.168.1.40");
    config
        .remember_dialect(
            "living-room",
            "3/api/telemetry/api/telemetry?request=set",
            Some("AA:BB:CC:DD:EE:FF"),
        )
        .unwrap();
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded, config);

    let (_, profile) = loaded.profile(Some("living-room")).unwrap();
    let device = profile.device_config(&loaded.defaults).unwrap();
    assert_eq!(
        device.dialect_id.as_deref(),
        Some("3/api/telemetry/api/telemetry?request=set")
    );
}

#[test]
fn test_hand_written_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "bedroom"

[defaults]
scan_interval = 20
output = "json"

[profiles.bedroom]
host = "10.0.0.7"
port = 48000
api_version = 0
"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    let (name, profile) = config.profile(None).unwrap();

    assert_eq!(name, "bedroom");
    assert_eq!(profile.port, Some(48000));
    assert_eq!(config.defaults.output, "json");
    // Unset defaults keep their built-in values.
    assert_eq!(config.defaults.retries, 5);
    assert_eq!(
        profile.coordinator_config(&config.defaults).update_interval,
        Duration::from_secs(20)
    );
    assert_eq!(
        profile.api_version_filter().unwrap(),
        Some(ventaly_core::ApiVersion::V0)
    );
}

#[test]
fn test_unknown_persisted_dialect_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[profiles.default]\nhost = \"10.0.0.7\"\napi_definition = \"9/whatever/None\"\n",
    )
    .unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_definition"));
}

#[test]
fn test_saved_profile_omits_unset_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.profiles.insert("default".into(), Profile::new("10.0.0.9"));

    save_config_to(&config, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    assert!(text.contains("host = \"10.0.0.9\""));
    assert!(!text.contains("api_definition"));
    assert!(!text.contains("mac"));
}
