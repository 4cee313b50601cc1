//! Shared configuration for Venta tools.
//!
//! TOML profiles, environment overrides, and translation to the runtime
//! `ventaly_core::DeviceConfig` / `CoordinatorConfig`. The detected dialect
//! identity is persisted per profile so later runs can skip detection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ventaly_api::RetryPolicy;
use ventaly_core::{ApiVersion, CoordinatorConfig, DeviceConfig, DialectDefinition, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Polling interval in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            output: default_output(),
        }
    }
}

fn default_scan_interval() -> u64 {
    10
}
fn default_timeout() -> u64 {
    10
}
fn default_retries() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_output() -> String {
    "table".into()
}

/// A named device profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Hostname or IP address of the appliance.
    pub host: String,

    /// Port override for every dialect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Dialect identity from a previous detection,
    /// e.g. "3/api/telemetry/api/telemetry?request=set".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_definition: Option<String>,

    /// Restrict detection to one API version (0, 2 or 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<u8>,

    /// Override the polling interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,

    /// Override the per-attempt timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// MAC learned during detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl Profile {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// The persisted dialect, if any. Unknown identities are an error.
    pub fn dialect(&self) -> Result<Option<&'static DialectDefinition>, ConfigError> {
        self.api_definition
            .as_deref()
            .map(|id| {
                DialectDefinition::from_id(id)
                    .ok_or_else(|| invalid("api_definition", format!("unknown dialect '{id}'")))
            })
            .transpose()
    }

    /// The detection filter, if any.
    pub fn api_version_filter(&self) -> Result<Option<ApiVersion>, ConfigError> {
        self.api_version
            .map(|v| ApiVersion::try_from(v).map_err(|e| invalid("api_version", e)))
            .transpose()
    }

    /// Build the runtime device config, filling gaps from `defaults`.
    pub fn device_config(&self, defaults: &Defaults) -> Result<DeviceConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }

        let timeout = Duration::from_secs(self.timeout.unwrap_or(defaults.timeout));
        let transport = TransportConfig {
            timeout,
            retry: RetryPolicy {
                max_attempts: defaults.retries.max(1),
                attempt_timeout: timeout,
                delay: Duration::from_millis(defaults.retry_delay_ms),
            },
            ..TransportConfig::default()
        };

        let mut config = DeviceConfig::new(self.host.trim()).with_transport(transport);
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(dialect) = self.dialect()? {
            config = config.with_dialect(dialect.id());
        }
        Ok(config)
    }

    pub fn coordinator_config(&self, defaults: &Defaults) -> CoordinatorConfig {
        let secs = self.scan_interval.unwrap_or(defaults.scan_interval);
        CoordinatorConfig::with_interval(Duration::from_secs(secs))
    }
}

// ── Profile management ──────────────────────────────────────────────

impl Config {
    /// Resolve a profile: the explicit name, else the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(String::from)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { profile: name }),
        }
    }

    /// Create `name` or point it at a new host. Changing the host forgets
    /// the persisted dialect and MAC.
    pub fn set_host(&mut self, name: &str, host: &str) {
        let profile = self
            .profiles
            .entry(name.to_owned())
            .or_insert_with(|| Profile::new(host));
        if profile.host != host {
            *profile = Profile {
                port: profile.port,
                api_version: profile.api_version,
                scan_interval: profile.scan_interval,
                timeout: profile.timeout,
                ..Profile::new(host)
            };
        }
    }

    /// Persist a detected dialect (and the learned MAC) on a profile.
    pub fn remember_dialect(
        &mut self,
        name: &str,
        dialect_id: &str,
        mac: Option<&str>,
    ) -> Result<(), ConfigError> {
        if DialectDefinition::from_id(dialect_id).is_none() {
            return Err(invalid("api_definition", format!("unknown dialect '{dialect_id}'")));
        }
        let profile = self
            .profiles
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })?;

        profile.api_definition = Some(dialect_id.to_owned());
        if let Some(mac) = mac {
            profile.mac = Some(mac.to_owned());
        }
        Ok(())
    }

    /// Reject values the runtime cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval("defaults.scan_interval", self.defaults.scan_interval)?;
        if self.defaults.timeout == 0 {
            return Err(invalid("defaults.timeout", "must be at least 1 second"));
        }
        if self.defaults.retries == 0 {
            return Err(invalid("defaults.retries", "must be at least 1"));
        }

        for (name, profile) in &self.profiles {
            if let Some(secs) = profile.scan_interval {
                validate_interval(&format!("profiles.{name}.scan_interval"), secs)?;
            }
            if profile.timeout == Some(0) {
                return Err(invalid(
                    format!("profiles.{name}.timeout"),
                    "must be at least 1 second",
                ));
            }
            profile.dialect()?;
            profile.api_version_filter()?;
        }
        Ok(())
    }
}

fn validate_interval(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < 1 {
        return Err(invalid(field, "must be at least 1 second"));
    }
    Ok(())
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "ventaly", "ventaly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ventaly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then `VENTALY_` environment overrides. Nested keys
/// use a double underscore: `VENTALY_DEFAULTS__SCAN_INTERVAL=30`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VENTALY_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn profile_resolution_falls_back_to_default() {
        let mut config = Config::default();
        config.set_host("default", "192.168.1.40");

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.host, "192.168.1.40");
        assert!(matches!(
            config.profile(Some("attic")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn changing_host_forgets_dialect() {
        let mut config = Config::default();
        config.set_host("lw74", "10.0.0.5");
        config
            .remember_dialect("lw74", "0/Complete/Action", Some("11:22:33:44:55:66"))
            .unwrap();

        config.set_host("lw74", "10.0.0.5");
        assert!(config.profiles["lw74"].api_definition.is_some());

        config.set_host("lw74", "10.0.0.6");
        let profile = &config.profiles["lw74"];
        assert_eq!(profile.host, "10.0.0.6");
        assert!(profile.api_definition.is_none());
        assert!(profile.mac.is_none());
    }

    #[test]
    fn unknown_dialect_is_not_remembered() {
        let mut config = Config::default();
        config.set_host("default", "10.0.0.5");
        assert!(config.remember_dialect("default", "4/nope/None", None).is_err());
    }

    #[test]
    fn validation_rejects_zero_interval() {
        let mut config = Config::default();
        config.defaults.scan_interval = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "defaults.scan_interval"
        ));
    }

    #[test]
    fn validation_rejects_bad_api_version() {
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                api_version: Some(1),
                ..Profile::new("10.0.0.5")
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn device_config_applies_defaults_and_overrides() {
        let defaults = Defaults {
            retries: 3,
            retry_delay_ms: 250,
            ..Defaults::default()
        };
        let profile = Profile {
            port: Some(8080),
            timeout: Some(4),
            api_definition: Some("2/datastructure/datastructure".into()),
            ..Profile::new("venta.local")
        };

        let config = profile.device_config(&defaults).unwrap();
        assert_eq!(config.host, "venta.local");
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.dialect_id.as_deref(), Some("2/datastructure/datastructure"));
        assert_eq!(config.transport.timeout, Duration::from_secs(4));
        assert_eq!(config.transport.retry.max_attempts, 3);
        assert_eq!(config.transport.retry.delay, Duration::from_millis(250));
    }

    #[test]
    fn coordinator_interval_from_profile() {
        let profile = Profile {
            scan_interval: Some(30),
            ..Profile::new("venta.local")
        };
        assert_eq!(
            profile.coordinator_config(&Defaults::default()).update_interval,
            Duration::from_secs(30)
        );
    }
}
