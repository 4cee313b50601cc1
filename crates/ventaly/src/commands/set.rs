//! `ventaly set`: build a control action, send it, show the new state.

use serde_json::Value;
use tracing::debug;

use ventaly_config::Config;
use ventaly_core::{
    ControlAction, Coordinator, DeviceType, FanMode, LedStripMode, Payload, TIMER_HOURS,
};

use crate::cli::{GlobalOpts, LedStripSetting, SetArgs, SetCommand};
use crate::commands::util::{self, StatusView};
use crate::config;
use crate::error::CliError;
use crate::output;

enum Body {
    Control(ControlAction),
    Raw(Payload),
}

/// A model feature a request depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    FanMode(FanMode),
    LedStrip,
    Timer,
}

struct Request {
    body: Body,
    needs: Option<Feature>,
}

impl Request {
    fn control(action: ControlAction) -> Self {
        Self {
            body: Body::Control(action),
            needs: None,
        }
    }

    fn needing(action: ControlAction, feature: Feature) -> Self {
        Self {
            body: Body::Control(action),
            needs: Some(feature),
        }
    }

    fn fan_mode(mode: FanMode) -> Result<Self, CliError> {
        let action = ControlAction::fan_mode(mode).ok_or_else(|| CliError::Unsupported {
            operation: format!("fan {mode}"),
            reason: "this mode cannot be selected remotely".into(),
        })?;
        Ok(Self::needing(action, Feature::FanMode(mode)))
    }
}

fn build_request(command: SetCommand) -> Result<Request, CliError> {
    Ok(match command {
        SetCommand::Power { state } => Request::control(ControlAction::power(state.is_on())),
        SetCommand::Humidity { percent } => Request::control(ControlAction::humidity(percent)),
        SetCommand::Fan { level } => Request::fan_mode(FanMode::Level(level))?,
        SetCommand::Sleep => Request::fan_mode(FanMode::Sleep)?,
        SetCommand::Auto => Request::fan_mode(FanMode::Auto)?,
        SetCommand::ChildLock { state } => {
            Request::control(ControlAction::child_lock(state.is_on()))
        }
        SetCommand::LedStrip { setting } => {
            let action = match setting {
                LedStripSetting::On => ControlAction::led_strip(true),
                LedStripSetting::Off => ControlAction::led_strip(false),
                LedStripSetting::Internal => ControlAction::led_strip_mode(LedStripMode::Internal),
                LedStripSetting::External => ControlAction::led_strip_mode(LedStripMode::External),
                LedStripSetting::InternalNoWater => {
                    ControlAction::led_strip_mode(LedStripMode::InternalNoWater)
                }
                LedStripSetting::ExternalNoWater => {
                    ControlAction::led_strip_mode(LedStripMode::ExternalNoWater)
                }
            };
            Request::needing(action, Feature::LedStrip)
        }
        SetCommand::LedColour { colour } => {
            Request::needing(ControlAction::led_strip_colour(colour), Feature::LedStrip)
        }
        SetCommand::Timer { hours } => {
            let action = ControlAction::timer(hours).ok_or_else(|| CliError::Validation {
                field: "hours".into(),
                reason: format!("expected one of {TIMER_HOURS:?}"),
            })?;
            Request::needing(action, Feature::Timer)
        }
        SetCommand::Raw { json } => match serde_json::from_str::<Value>(&json)? {
            Value::Object(map) => Request {
                body: Body::Raw(map),
                needs: None,
            },
            _ => {
                return Err(CliError::Validation {
                    field: "json".into(),
                    reason: "expected a JSON object".into(),
                });
            }
        },
    })
}

/// Reject typed requests the model cannot carry out. Unknown models get
/// the benefit of the doubt; raw bodies are never checked.
fn check_supported(device_type: DeviceType, request: &Request) -> Result<(), CliError> {
    if device_type == DeviceType::Unknown || matches!(request.body, Body::Raw(_)) {
        return Ok(());
    }
    let unsupported = |operation: String| CliError::Unsupported {
        operation,
        reason: format!("{device_type} does not offer this"),
    };

    let caps = device_type.capabilities();
    if caps.is_read_only() {
        return Err(unsupported("control".into()));
    }

    match request.needs {
        Some(Feature::FanMode(mode)) if !caps.supports_fan_mode(mode) => {
            Err(unsupported(format!("fan {mode}")))
        }
        Some(Feature::LedStrip) if !caps.led_strip => Err(unsupported("led strip".into())),
        Some(Feature::Timer) if !caps.timer => Err(unsupported("timer".into())),
        _ => Ok(()),
    }
}

pub async fn handle(args: SetArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let request = build_request(args.command)?;
    let target = config::resolve_target(global, cfg)?;
    let format = config::output_format(global, cfg);
    let color = output::should_color(global.color);

    let (device, snapshot) = util::connect(&target).await?;
    let device_type = device.device_type();
    check_supported(device_type, &request)?;

    let coordinator = Coordinator::new(device, target.coordinator.clone());
    coordinator.set_updated_data(snapshot).await;

    match &request.body {
        Body::Control(action) => {
            debug!(?action, "sending control action");
            coordinator.control(action).await?;
        }
        Body::Raw(body) => {
            debug!(?body, "sending raw action");
            coordinator.action(body).await?;
        }
    }

    let Some(info) = coordinator.device_info().await else {
        return Ok(());
    };
    let data = coordinator.data();
    let caps = device_type.capabilities();
    let view = StatusView {
        device: info,
        warnings: caps.active_warnings(data.warnings().unwrap_or(0)),
        counters: Vec::new(),
        snapshot: &data,
    };
    let out = output::render_single(
        format,
        &view,
        |v| util::status_detail(v, color),
        |v| util::status_plain(v.snapshot),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Toggle;

    fn control(request: &Request) -> &ControlAction {
        match &request.body {
            Body::Control(action) => action,
            Body::Raw(_) => panic!("expected a control action"),
        }
    }

    #[test]
    fn raw_body_must_be_an_object() {
        let err = build_request(SetCommand::Raw { json: "[1,2]".into() });
        assert!(matches!(err, Err(CliError::Validation { .. })));
        assert!(matches!(
            build_request(SetCommand::Raw { json: "{nope".into() }),
            Err(CliError::Json(_))
        ));
    }

    #[test]
    fn fan_commands_go_through_fan_mode() {
        let auto = build_request(SetCommand::Auto).unwrap();
        assert_eq!(auto.needs, Some(Feature::FanMode(FanMode::Auto)));
        assert_eq!(control(&auto), &ControlAction::automatic());

        let level = build_request(SetCommand::Fan { level: 4 }).unwrap();
        assert_eq!(level.needs, Some(Feature::FanMode(FanMode::Level(4))));
        assert_eq!(control(&level).fan_speed, Some(4));

        let lock = build_request(SetCommand::ChildLock { state: Toggle::On }).unwrap();
        assert_eq!(lock.needs, None);
        assert_eq!(control(&lock).child_lock, Some(true));
    }

    #[test]
    fn led_strip_settings() {
        let off = build_request(SetCommand::LedStrip { setting: LedStripSetting::Off }).unwrap();
        assert_eq!(off.needs, Some(Feature::LedStrip));
        assert_eq!(control(&off).led_strip_active, Some(false));

        let mode = build_request(SetCommand::LedStrip {
            setting: LedStripSetting::ExternalNoWater,
        })
        .unwrap();
        assert_eq!(control(&mode).led_strip_mode, Some(3));

        let colour = build_request(SetCommand::LedColour {
            colour: "#ff8800".parse().unwrap(),
        })
        .unwrap();
        assert_eq!(
            control(&colour).fields().get("LEDStrip"),
            Some(&Value::from("#ff8800"))
        );
    }

    #[test]
    fn timer_rejects_unsupported_hours() {
        assert!(matches!(
            build_request(SetCommand::Timer { hours: 2 }),
            Err(CliError::Validation { .. })
        ));
        let timer = build_request(SetCommand::Timer { hours: 7 }).unwrap();
        assert_eq!(timer.needs, Some(Feature::Timer));
        assert_eq!(control(&timer).timer, Some(7));
    }

    #[test]
    fn capabilities_gate_typed_requests() {
        let led = build_request(SetCommand::LedStrip { setting: LedStripSetting::On }).unwrap();
        let timer = build_request(SetCommand::Timer { hours: 1 }).unwrap();
        let sleep = build_request(SetCommand::Sleep).unwrap();
        let power = build_request(SetCommand::Power { state: Toggle::Off }).unwrap();

        assert!(check_supported(DeviceType::Lw73Lw74, &led).is_ok());
        assert!(matches!(
            check_supported(DeviceType::Lw62T, &led),
            Err(CliError::Unsupported { .. })
        ));
        assert!(check_supported(DeviceType::Lw62T, &timer).is_ok());
        assert!(check_supported(DeviceType::Lw73Lw74, &timer).is_err());
        assert!(check_supported(DeviceType::Ah550Ah555, &sleep).is_err());
        assert!(check_supported(DeviceType::Unknown, &led).is_ok());
        assert!(check_supported(DeviceType::As150, &power).is_err());
    }
}
