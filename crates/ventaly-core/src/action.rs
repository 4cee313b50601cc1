// ── Control actions ──
//
// Builds the action body for a device. V0 and V2 firmware take the fields
// nested under an `Action` key; V3 takes them at the top level with
// `"Action": "control"` and expects the unchanged state echoed back.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;
use ventaly_api::{ApiVersion, Payload};

use crate::model::FanMode;

/// State keys V3 firmware needs in every control request.
const V3_ECHOED: [&str; 4] = ["Power", "Automatic", "FanSpeed", "SleepMode"];

/// Switch-off timer settings the firmware accepts, in hours. 0 disables it.
pub const TIMER_HOURS: [u8; 6] = [0, 1, 3, 5, 7, 9];

/// What drives the LED strip colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LedStripMode {
    /// Colour follows the device state.
    Internal,
    /// Colour set by the user.
    External,
    /// Internal, but stays dark while the tank is empty.
    InternalNoWater,
    /// External, but stays dark while the tank is empty.
    ExternalNoWater,
}

impl LedStripMode {
    pub fn code(self) -> u8 {
        match self {
            Self::Internal => 0,
            Self::External => 1,
            Self::InternalNoWater => 2,
            Self::ExternalNoWater => 3,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Internal),
            1 => Some(Self::External),
            2 => Some(Self::InternalNoWater),
            3 => Some(Self::ExternalNoWater),
            _ => None,
        }
    }
}

/// An RGB colour for the LED strip, sent as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedColour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl fmt::Display for LedColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for LedColour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected a colour like #ff8800, got '{s}'"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| format!("expected a colour like #ff8800, got '{s}'"))
        };
        Ok(Self {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}

impl Serialize for LedColour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A partial update of a device's `Action` section. Unset fields are
/// left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(rename = "TargetHum", skip_serializing_if = "Option::is_none")]
    pub target_humidity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_lock: Option<bool>,
    #[serde(rename = "LEDStripActive", skip_serializing_if = "Option::is_none")]
    pub led_strip_active: Option<bool>,
    #[serde(rename = "LEDStrip", skip_serializing_if = "Option::is_none")]
    pub led_strip_colour: Option<LedColour>,
    #[serde(rename = "LEDStripMode", skip_serializing_if = "Option::is_none")]
    pub led_strip_mode: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<u8>,
}

impl ControlAction {
    pub fn power(on: bool) -> Self {
        Self {
            power: Some(on),
            ..Self::default()
        }
    }

    pub fn humidity(target: u8) -> Self {
        Self {
            target_humidity: Some(target),
            ..Self::default()
        }
    }

    /// Manual fan level. Switches the device on and leaves sleep and
    /// automatic mode.
    pub fn fan_speed(level: u8) -> Self {
        Self {
            power: Some(true),
            fan_speed: Some(level),
            sleep_mode: Some(false),
            automatic: Some(false),
            ..Self::default()
        }
    }

    pub fn sleep() -> Self {
        Self {
            power: Some(true),
            sleep_mode: Some(true),
            ..Self::default()
        }
    }

    pub fn automatic() -> Self {
        Self {
            power: Some(true),
            sleep_mode: Some(false),
            automatic: Some(true),
            ..Self::default()
        }
    }

    pub fn child_lock(on: bool) -> Self {
        Self {
            child_lock: Some(on),
            ..Self::default()
        }
    }

    pub fn led_strip(on: bool) -> Self {
        Self {
            led_strip_active: Some(on),
            ..Self::default()
        }
    }

    pub fn led_strip_colour(colour: LedColour) -> Self {
        Self {
            led_strip_colour: Some(colour),
            ..Self::default()
        }
    }

    pub fn led_strip_mode(mode: LedStripMode) -> Self {
        Self {
            led_strip_mode: Some(mode.code()),
            ..Self::default()
        }
    }

    /// Switch-off timer. `None` unless `hours` is one of [`TIMER_HOURS`].
    pub fn timer(hours: u8) -> Option<Self> {
        TIMER_HOURS.contains(&hours).then(|| Self {
            timer: Some(hours),
            ..Self::default()
        })
    }

    /// The action selecting `mode`. Boost has no known control encoding.
    pub fn fan_mode(mode: FanMode) -> Option<Self> {
        match mode {
            FanMode::Auto => Some(Self::automatic()),
            FanMode::Sleep => Some(Self::sleep()),
            FanMode::Level(n) => Some(Self::fan_speed(n)),
            FanMode::Boost => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The set fields as a wire-named map.
    pub fn fields(&self) -> Payload {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Payload::new(),
        }
    }

    /// Render the request body for `version`. `current` is the device's
    /// last known `Action` section; V3 requests echo its state for any
    /// field this action leaves unset.
    pub fn render(&self, version: ApiVersion, current: Option<&Payload>) -> Payload {
        let mut fields = self.fields();

        match version {
            ApiVersion::V0 | ApiVersion::V2 => {
                let mut body = Payload::new();
                body.insert("Action".into(), Value::Object(fields));
                body
            }
            ApiVersion::V3 => {
                if let Some(current) = current {
                    for key in V3_ECHOED {
                        if fields.contains_key(key) {
                            continue;
                        }
                        if let Some(value) = current.get(key).filter(|v| !v.is_null()) {
                            fields.insert(key.into(), value.clone());
                        }
                    }
                    let automatic = fields.get("Automatic").and_then(Value::as_bool) == Some(true);
                    if automatic && self.sleep_mode.is_none() {
                        fields.remove("SleepMode");
                    }
                }
                fields.insert("Action".into(), Value::String("control".into()));
                fields
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn v2_nests_fields_under_action() {
        let body = ControlAction::humidity(45).render(ApiVersion::V2, None);
        assert_eq!(body, object(json!({"Action": {"TargetHum": 45}})));
    }

    #[test]
    fn v0_uses_the_same_shape_as_v2() {
        let action = ControlAction::power(false);
        assert_eq!(
            action.render(ApiVersion::V0, None),
            action.render(ApiVersion::V2, None)
        );
    }

    #[test]
    fn fan_speed_leaves_sleep_and_auto() {
        assert_eq!(
            ControlAction::fan_speed(3).fields(),
            object(json!({"Power": true, "FanSpeed": 3, "SleepMode": false, "Automatic": false}))
        );
    }

    #[test]
    fn wire_names_cover_every_field() {
        let action = ControlAction {
            child_lock: Some(true),
            led_strip_active: Some(true),
            led_strip_colour: Some(LedColour { red: 255, green: 136, blue: 0 }),
            led_strip_mode: Some(LedStripMode::ExternalNoWater.code()),
            timer: Some(3),
            ..ControlAction::default()
        };
        assert_eq!(
            action.fields(),
            object(json!({
                "ChildLock": true,
                "LEDStripActive": true,
                "LEDStrip": "#ff8800",
                "LEDStripMode": 3,
                "Timer": 3
            }))
        );
    }

    #[test]
    fn led_colour_parses_with_or_without_hash() {
        let colour: LedColour = "#FF8800".parse().unwrap();
        assert_eq!(colour, LedColour { red: 255, green: 136, blue: 0 });
        assert_eq!("0a0b0c".parse::<LedColour>().unwrap().to_string(), "#0a0b0c");
        assert!("#ff88".parse::<LedColour>().is_err());
        assert!("#gg0000".parse::<LedColour>().is_err());
        assert!("#ffé00".parse::<LedColour>().is_err());
    }

    #[test]
    fn led_strip_mode_codes() {
        assert_eq!(LedStripMode::Internal.code(), 0);
        assert_eq!(LedStripMode::InternalNoWater.code(), 2);
        assert_eq!(LedStripMode::from_code(1), Some(LedStripMode::External));
        assert_eq!(LedStripMode::from_code(4), None);
        assert_eq!(
            ControlAction::led_strip_mode(LedStripMode::External).render(ApiVersion::V2, None),
            object(json!({"Action": {"LEDStripMode": 1}}))
        );
    }

    #[test]
    fn timer_accepts_only_firmware_settings() {
        assert_eq!(ControlAction::timer(5).unwrap().timer, Some(5));
        assert!(ControlAction::timer(0).is_some());
        assert!(ControlAction::timer(2).is_none());
        assert!(ControlAction::timer(10).is_none());
    }

    #[test]
    fn fan_mode_maps_to_builders() {
        assert_eq!(ControlAction::fan_mode(FanMode::Auto), Some(ControlAction::automatic()));
        assert_eq!(ControlAction::fan_mode(FanMode::Sleep), Some(ControlAction::sleep()));
        assert_eq!(
            ControlAction::fan_mode(FanMode::Level(2)),
            Some(ControlAction::fan_speed(2))
        );
        assert_eq!(ControlAction::fan_mode(FanMode::Boost), None);
    }

    #[test]
    fn v3_echoes_current_state() {
        let current = object(json!({"Power": true, "Automatic": false, "FanSpeed": 2, "SleepMode": false, "TargetHum": 50}));

        let body = ControlAction::humidity(40).render(ApiVersion::V3, Some(&current));

        assert_eq!(
            body,
            object(json!({
                "TargetHum": 40,
                "Power": true,
                "Automatic": false,
                "FanSpeed": 2,
                "SleepMode": false,
                "Action": "control"
            }))
        );
    }

    #[test]
    fn v3_drops_echoed_sleep_when_automatic() {
        let current = object(json!({"Power": true, "Automatic": true, "FanSpeed": 1, "SleepMode": true}));

        let body = ControlAction::power(false).render(ApiVersion::V3, Some(&current));

        assert_eq!(
            body,
            object(json!({"Power": false, "Automatic": true, "FanSpeed": 1, "Action": "control"}))
        );
    }

    #[test]
    fn v3_without_state_sends_only_set_fields() {
        let body = ControlAction::sleep().render(ApiVersion::V3, None);
        assert_eq!(
            body,
            object(json!({"Power": true, "SleepMode": true, "Action": "control"}))
        );
    }

    #[test]
    fn default_action_is_empty() {
        assert!(ControlAction::default().is_empty());
        assert!(!ControlAction::timer(1).unwrap().is_empty());
    }
}
