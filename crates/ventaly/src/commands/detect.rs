//! `ventaly detect`: try dialects, report the device, optionally persist.

use serde::Serialize;
use tracing::info;

use ventaly_config::Config;
use ventaly_core::{ApiVersion, Device};

use crate::cli::{DetectArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct DetectReport {
    host: String,
    api_definition: String,
    api_version: u8,
    mac: Option<String>,
    model: &'static str,
    device_type_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_as: Option<String>,
}

pub async fn handle(args: DetectArgs, global: &GlobalOpts, mut cfg: Config) -> Result<(), CliError> {
    let target = config::resolve_target(global, &cfg)?;
    let version = match args.api_version {
        Some(v) => Some(ApiVersion::try_from(v).map_err(|reason| CliError::Validation {
            field: "api-version".into(),
            reason,
        })?),
        None => target.api_version,
    };

    // Always detect, ignoring any persisted dialect.
    let mut device_config = target.device.clone();
    device_config.dialect_id = None;
    let mut device = Device::new(device_config)?;
    let dialect = device.detect_api(version).await?;
    device.init().await?;
    let identity = super::util::identity(&device)?;

    let mut report = DetectReport {
        host: device.host().to_owned(),
        api_definition: dialect.id(),
        api_version: dialect.version.number(),
        mac: identity.mac.clone(),
        model: identity.device_type.model_name(),
        device_type_code: identity.device_type_code,
        saved_as: None,
    };

    if let Some(name) = args.save {
        cfg.set_host(&name, &report.host);
        if let (Some(port), Some(profile)) = (global.port, cfg.profiles.get_mut(&name)) {
            profile.port = Some(port);
        }
        cfg.remember_dialect(&name, &report.api_definition, report.mac.as_deref())?;
        config::save_config(&cfg)?;
        info!(profile = %name, dialect = %report.api_definition, "dialect saved");
        report.saved_as = Some(name);
    }

    let format = config::output_format(global, &cfg);
    let out = output::render_single(
        format,
        &report,
        |r| {
            let mut text = format!(
                "{} at {}\n  Dialect:  {}\n  MAC:      {}",
                r.model,
                r.host,
                r.api_definition,
                r.mac.as_deref().unwrap_or("-"),
            );
            if let Some(name) = &r.saved_as {
                text.push_str(&format!("\n  Saved as profile '{name}'"));
            }
            text
        },
        |r| r.api_definition.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
