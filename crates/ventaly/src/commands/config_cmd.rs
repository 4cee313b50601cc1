//! `ventaly config`: inspect and edit the profile file. Never touches a device.

use serde::Serialize;
use tabled::Tabled;

use ventaly_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ProfileSummary {
    name: String,
    default: bool,
    host: String,
    port: Option<u16>,
    api_definition: Option<String>,
    mac: Option<String>,
    scan_interval: u64,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Dialect")]
    dialect: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Interval")]
    interval: String,
}

impl From<&ProfileSummary> for ProfileRow {
    fn from(p: &ProfileSummary) -> Self {
        Self {
            marker: if p.default { "*" } else { "" },
            name: p.name.clone(),
            host: p.port.map_or_else(|| p.host.clone(), |port| format!("{}:{port}", p.host)),
            dialect: p.api_definition.clone().unwrap_or_else(|| "-".into()),
            mac: p.mac.clone().unwrap_or_else(|| "-".into()),
            interval: format!("{}s", p.scan_interval),
        }
    }
}

fn summaries(cfg: &Config) -> Vec<ProfileSummary> {
    cfg.profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            default: cfg.default_profile.as_deref() == Some(name.as_str()),
            host: profile.host.clone(),
            port: profile.port,
            api_definition: profile.api_definition.clone(),
            mac: profile.mac.clone(),
            scan_interval: profile.scan_interval.unwrap_or(cfg.defaults.scan_interval),
        })
        .collect()
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts, mut cfg: Config) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let format = config::output_format(global, &cfg);
            let out = output::render_list(
                format,
                &summaries(&cfg),
                |p| ProfileRow::from(p),
                |p| format!("{}\t{}", p.name, p.host),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetHost { host, default } => {
            let host = host.trim();
            if host.is_empty() {
                return Err(CliError::Validation {
                    field: "host".into(),
                    reason: "must not be empty".into(),
                });
            }

            let name = config::active_profile_name(global, &cfg);
            cfg.set_host(&name, host);
            if let (Some(port), Some(profile)) = (global.port, cfg.profiles.get_mut(&name)) {
                profile.port = Some(port);
            }
            if default || cfg.default_profile.is_none() {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("Profile '{name}' now points at {host}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ventaly_config::Profile;

    use super::*;

    #[test]
    fn summaries_mark_the_default_profile() {
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), Profile::new("10.0.0.5"));
        cfg.profiles.insert("office".into(), Profile {
            scan_interval: Some(30),
            ..Profile::new("10.0.0.6")
        });

        let list = summaries(&cfg);
        assert_eq!(list.len(), 2);
        assert!(list[0].default);
        assert!(!list[1].default);
        assert_eq!(list[1].scan_interval, 30);
        assert_eq!(ProfileRow::from(&list[0]).interval, "10s");
    }
}
