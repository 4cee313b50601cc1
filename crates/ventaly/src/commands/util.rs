//! Shared helpers for command handlers.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tracing::debug;

use ventaly_core::{
    CounterReading, Device, DeviceIdentity, DeviceInfo, DeviceSnapshot, LedStripMode, Payload,
};

use crate::config::Target;
use crate::error::CliError;
use crate::output;

/// Open the target device: detect its dialect unless one is persisted,
/// then init. Returns the device and its first snapshot.
pub async fn connect(target: &Target) -> Result<(Device, DeviceSnapshot), CliError> {
    let mut device = Device::new(target.device.clone())?;
    if device.dialect().is_none() {
        debug!(host = device.host(), "no persisted dialect, detecting");
        device.detect_api(target.api_version).await?;
    }
    let snapshot = device.init().await?;
    Ok((device, snapshot))
}

// ── Status rendering ─────────────────────────────────────────────────

/// Everything `status` shows, for structured output formats.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    pub device: DeviceInfo,
    pub warnings: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counters: Vec<CounterReading>,
    pub snapshot: &'a DeviceSnapshot,
}

impl<'a> StatusView<'a> {
    pub fn new(identity: &DeviceIdentity, snapshot: &'a DeviceSnapshot, counters: bool) -> Self {
        let caps = identity.device_type.capabilities();
        Self {
            device: DeviceInfo::new(identity, snapshot),
            warnings: caps.active_warnings(snapshot.warnings().unwrap_or(0)),
            counters: if counters {
                caps.counters.iter().filter_map(|c| c.read(&snapshot.info)).collect()
            } else {
                Vec::new()
            },
            snapshot,
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Section")]
    section: &'static str,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct CounterRow {
    #[tabled(rename = "Counter")]
    label: String,
    #[tabled(rename = "Ticks")]
    ticks: u32,
    #[tabled(rename = "Minutes")]
    minutes: u64,
    #[tabled(rename = "Days left")]
    days_left: String,
}

/// Human-readable status: a summary header, then every field.
pub fn status_detail(view: &StatusView<'_>, color: bool) -> String {
    let snapshot = view.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", view.device.name, view.device.api_definition);
    if let Some(mac) = &view.device.mac {
        let _ = writeln!(out, "  MAC:       {mac}");
    }
    if let Some(sw) = &view.device.sw_version {
        let _ = writeln!(out, "  Firmware:  {sw}");
    }
    let device_type = view.device.device_type;
    let caps = device_type.capabilities();
    if !device_type.is_sensor() {
        let power = if snapshot.power() {
            output::good("on", color)
        } else {
            output::dim("off", color)
        };
        let _ = writeln!(out, "  Power:     {power}");
        let _ = writeln!(out, "  Fan:       {}", snapshot.fan_mode());
        if let Some(target) = snapshot.target_humidity() {
            let _ = writeln!(out, "  Target:    {target}%");
        }
    }
    if let Some(humidity) = snapshot.humidity() {
        let _ = writeln!(out, "  Humidity:  {humidity}%");
    }
    if let Some(temperature) = snapshot.temperature() {
        let _ = writeln!(out, "  Temp:      {temperature}°C");
    }
    for (key, label, unit) in AIR_QUALITY {
        if let Some(value) = caps.measure(&snapshot.measure, key) {
            let _ = writeln!(out, "  {label:<10} {}{unit}", output::scalar(value));
        }
    }
    if caps.led_strip {
        let _ = writeln!(out, "  LED strip: {}", led_strip_summary(&snapshot.action));
    }
    if !view.warnings.is_empty() {
        let _ = writeln!(
            out,
            "  Warnings:  {}",
            output::warn(&view.warnings.join(", "), color)
        );
    }

    let mut rows = Vec::new();
    for (section, payload) in sections(snapshot) {
        rows.extend(payload.iter().map(|(field, value)| FieldRow {
            section,
            field: field.clone(),
            value: output::scalar(value),
        }));
    }
    let _ = write!(out, "\n{}", output::render_table(&rows));

    if !view.counters.is_empty() {
        let _ = write!(out, "\n\n{}", counters_table(&view.counters, color));
    }
    out
}

/// Air-quality measures shown in the summary: key, label, unit.
const AIR_QUALITY: [(&str, &str, &str); 3] = [
    ("Co2", "CO2:", " ppm"),
    ("Voc", "VOC:", ""),
    ("Hcho", "HCHO:", " ppb"),
];

/// `on, #ff8800, external` from the `Action` section.
fn led_strip_summary(action: &Payload) -> String {
    let mut parts = Vec::new();
    match action.get("LEDStripActive").and_then(Value::as_bool) {
        Some(true) => parts.push("on".to_owned()),
        Some(false) => parts.push("off".to_owned()),
        None => {}
    }
    if let Some(colour) = action.get("LEDStrip").and_then(Value::as_str) {
        parts.push(colour.to_owned());
    }
    let mode = action
        .get("LEDStripMode")
        .and_then(Value::as_u64)
        .and_then(LedStripMode::from_code);
    if let Some(mode) = mode {
        parts.push(led_strip_mode_name(mode).to_owned());
    }
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join(", ")
    }
}

fn led_strip_mode_name(mode: LedStripMode) -> &'static str {
    match mode {
        LedStripMode::Internal => "internal",
        LedStripMode::External => "external",
        LedStripMode::InternalNoWater => "internal, no water",
        LedStripMode::ExternalNoWater => "external, no water",
    }
}

fn counters_table(counters: &[CounterReading], color: bool) -> String {
    let rows: Vec<CounterRow> = counters
        .iter()
        .map(|c| {
            let days_left = match (c.days_left, c.needs_maintenance()) {
                (Some(days), Some(true)) => output::warn(&days.to_string(), color),
                (Some(days), _) => days.to_string(),
                (None, _) => "-".into(),
            };
            CounterRow {
                label: if c.suspect {
                    format!("{} (unreliable)", c.label)
                } else {
                    c.label.to_owned()
                },
                ticks: c.ticks,
                minutes: c.minutes,
                days_left,
            }
        })
        .collect();
    output::render_table(&rows)
}

/// `section.field=value` lines for plain output.
pub fn status_plain(snapshot: &DeviceSnapshot) -> String {
    sections(snapshot)
        .into_iter()
        .flat_map(|(section, payload)| {
            payload
                .iter()
                .map(move |(field, value)| format!("{section}.{field}={}", output::scalar(value)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sections(snapshot: &DeviceSnapshot) -> [(&'static str, &Payload); 4] {
    [
        ("Header", &snapshot.header),
        ("Action", &snapshot.action),
        ("Info", &snapshot.info),
        ("Measure", &snapshot.measure),
    ]
}

/// The identity `init` learned, or an internal error if it is missing.
pub fn identity(device: &Device) -> Result<&DeviceIdentity, CliError> {
    device.identity().ok_or_else(|| CliError::UpdateFailed {
        message: "device identity unknown after init".into(),
    })
}
