//! CLI-side configuration: merges the profile from `ventaly-config` with
//! `GlobalOpts` overrides into the runtime configs the core consumes.

use std::time::Duration;

use ventaly_config::{Config, Profile};
use ventaly_core::{ApiVersion, CoordinatorConfig, DeviceConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use ventaly_config::{config_path, load_config, save_config};

/// Everything a device command needs to reach one appliance.
#[derive(Debug)]
pub struct Target {
    pub device: DeviceConfig,
    pub coordinator: CoordinatorConfig,
    pub api_version: Option<ApiVersion>,
}

/// Name of the profile selected by `--profile` or the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve the target device from the profile plus flag overrides.
///
/// `--host` alone is enough; a host that differs from the profile's
/// drops the profile's persisted dialect.
pub fn resolve_target(global: &GlobalOpts, cfg: &Config) -> Result<Target, CliError> {
    let name = active_profile_name(global, cfg);

    let mut profile = match (cfg.profiles.get(&name), &global.host) {
        (Some(profile), None) => profile.clone(),
        (Some(profile), Some(host)) if profile.host == *host => profile.clone(),
        (Some(_) | None, Some(host)) => Profile::new(host.clone()),
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name,
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(port) = global.port {
        profile.port = Some(port);
    }
    if let Some(timeout) = global.timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        profile.timeout = Some(timeout);
    }

    Ok(Target {
        device: profile.device_config(&cfg.defaults)?,
        coordinator: profile.coordinator_config(&cfg.defaults),
        api_version: profile.api_version_filter()?,
    })
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Output format from `--output`, else the config default, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    use clap::ValueEnum;

    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Coordinator config with an explicit interval override.
pub fn with_interval(coordinator: &CoordinatorConfig, interval: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        update_interval: CoordinatorConfig::with_interval(interval).update_interval,
        ..coordinator.clone()
    }
}
