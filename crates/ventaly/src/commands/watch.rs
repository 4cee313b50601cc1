//! `ventaly watch`: run a coordinator and print every published snapshot.

use chrono::Local;
use tracing::warn;

use ventaly_config::Config;
use ventaly_core::{Coordinator, DeviceSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::commands::util;
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &WatchArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let target = config::resolve_target(global, cfg)?;
    let format = config::output_format(global, cfg);
    let color = output::should_color(global.color);

    let (device, snapshot) = util::connect(&target).await?;
    let coordinator_config = match args.interval {
        Some(interval) => config::with_interval(&target.coordinator, interval),
        None => target.coordinator.clone(),
    };
    let coordinator = Coordinator::new(device, coordinator_config);
    let mut state = coordinator.state();

    coordinator.set_updated_data(snapshot).await;
    let mut last_version = state.borrow_and_update().version;
    output::print_output(&render_update(format, &coordinator.data(), color)?, global.quiet);
    let mut printed = 1_u64;

    coordinator.start().await;
    while args.count.is_none_or(|n| printed < n) {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if current.version > last_version {
                    last_version = current.version;
                    output::print_output(&render_update(format, &coordinator.data(), color)?, global.quiet);
                    printed += 1;
                } else if let Some(error) = current.last_error {
                    warn!(%error, "poll failed, keeping last known state");
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

/// One update: a summary line for humans, one document per update for
/// structured formats.
fn render_update(
    format: OutputFormat,
    snapshot: &DeviceSnapshot,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(summary_line(snapshot, color)),
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(snapshot)?),
        OutputFormat::Yaml => {
            let doc = output::render_single(format, snapshot, |_| String::new(), |_| String::new())?;
            Ok(format!("---\n{doc}"))
        }
    }
}

fn summary_line(snapshot: &DeviceSnapshot, color: bool) -> String {
    let time = snapshot
        .fetched_at
        .map_or_else(|| "--:--:--".into(), |t| t.with_timezone(&Local).format("%H:%M:%S").to_string());
    let power = if snapshot.power() {
        output::good("on ", color)
    } else {
        output::dim("off", color)
    };
    let humidity = snapshot
        .humidity()
        .map_or_else(|| "-".into(), |h| format!("{h}%"));
    let target = snapshot
        .target_humidity()
        .map_or_else(|| "-".into(), |t| format!("{t}%"));
    let warnings = match snapshot.warnings() {
        Some(mask) if mask != 0 => output::warn(&format!("warnings={mask:#x}"), color),
        _ => String::new(),
    };

    format!(
        "{time}  {power}  {:<8}  humidity {humidity} (target {target})  {warnings}",
        snapshot.fan_mode().to_string()
    )
    .trim_end()
    .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn summary_line_without_color() {
        let snapshot = DeviceSnapshot::from_payload(
            json!({
                "Action": {"Power": true, "FanSpeed": 3, "TargetHum": 50},
                "Measure": {"Humidity": 41},
                "Info": {"Warnings": 0}
            })
            .as_object()
            .cloned(),
        );

        let line = summary_line(&snapshot, false);
        assert!(line.contains("on "));
        assert!(line.contains("level 3"));
        assert!(line.ends_with("humidity 41% (target 50%)"));
    }

    #[test]
    fn json_updates_are_single_lines() {
        let snapshot = DeviceSnapshot::from_payload(json!({"Header": {"A": 1}}).as_object().cloned());
        let out = render_update(OutputFormat::Json, &snapshot, false).unwrap();
        assert!(!out.contains('\n'));
    }
}
