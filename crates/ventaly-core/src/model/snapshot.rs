// ── Device snapshot ──
//
// One decoded device response, split into its four wire sections. A
// snapshot is immutable once built; the coordinator publishes it behind an
// `Arc` and replaces it wholesale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use ventaly_api::Payload;

use super::capabilities::FanMode;

/// The normalized state of a device at one point in time.
///
/// `is_empty()` marks the "no new data" sentinel, which is distinct from a
/// real response whose sections happen to be empty. Consumers holding a
/// previous snapshot keep it when handed the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub header: Payload,
    pub action: Payload,
    pub info: Payload,
    pub measure: Payload,
    /// When the response was decoded. `None` for the sentinel.
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    empty: bool,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl DeviceSnapshot {
    /// The "no new data" sentinel.
    pub fn empty() -> Self {
        Self {
            header: Payload::new(),
            action: Payload::new(),
            info: Payload::new(),
            measure: Payload::new(),
            fetched_at: None,
            empty: true,
        }
    }

    /// Map a raw response into a snapshot. A missing or empty response is
    /// the sentinel; missing or non-object sections become empty maps.
    pub fn from_payload(payload: Option<Payload>) -> Self {
        let Some(mut payload) = payload.filter(|p| !p.is_empty()) else {
            return Self::empty();
        };

        Self {
            header: take_section(&mut payload, "Header"),
            action: take_section(&mut payload, "Action"),
            info: take_section(&mut payload, "Info"),
            measure: take_section(&mut payload, "Measure"),
            fetched_at: Some(Utc::now()),
            empty: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    // ── Header ───────────────────────────────────────────────────────

    /// Device MAC. The vendor spells the key `MacAdress`; some firmware
    /// only exposes a `DeviceId`.
    pub fn mac(&self) -> Option<&str> {
        ["MacAdress", "MacAddress", "DeviceId"]
            .iter()
            .find_map(|key| self.header.get(*key).and_then(Value::as_str))
            .filter(|mac| !mac.is_empty())
    }

    /// Numeric model code, sent as an integer or a numeric string.
    pub fn device_type_code(&self) -> Option<i64> {
        match self.header.get("DeviceType")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    // ── Info ─────────────────────────────────────────────────────────

    pub fn sw_version(&self) -> Option<&str> {
        self.info.get("SWMain").and_then(Value::as_str)
    }

    /// The raw warning bitmask, if the device reports one.
    pub fn warnings(&self) -> Option<u64> {
        self.info.get("Warnings").and_then(Value::as_u64)
    }

    // ── Action ───────────────────────────────────────────────────────

    pub fn power(&self) -> bool {
        self.action_flag("Power")
    }

    pub fn target_humidity(&self) -> Option<u64> {
        self.action.get("TargetHum").and_then(Value::as_u64)
    }

    /// Active fan mode, with automatic taking precedence over sleep.
    pub fn fan_mode(&self) -> FanMode {
        if self.action_flag("Automatic") {
            return FanMode::Auto;
        }
        if self.action_flag("SleepMode") {
            return FanMode::Sleep;
        }
        let level = self
            .action
            .get("FanSpeed")
            .and_then(Value::as_u64)
            .and_then(|l| u8::try_from(l).ok())
            .unwrap_or(1);
        FanMode::Level(level)
    }

    fn action_flag(&self, key: &str) -> bool {
        match self.action.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        }
    }

    // ── Measure ──────────────────────────────────────────────────────

    pub fn humidity(&self) -> Option<f64> {
        self.measure.get("Humidity").and_then(Value::as_f64)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.measure.get("Temperature").and_then(Value::as_f64)
    }
}

fn take_section(payload: &mut Payload, key: &str) -> Payload {
    match payload.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Payload::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn snapshot(value: Value) -> DeviceSnapshot {
        DeviceSnapshot::from_payload(value.as_object().cloned())
    }

    #[test]
    fn sections_map_and_missing_ones_default_to_empty() {
        let snap = snapshot(json!({"Header": {"MacAdress": "AA:BB"}, "Info": {"Warnings": 3}}));

        assert_eq!(snap.header.get("MacAdress"), Some(&json!("AA:BB")));
        assert_eq!(snap.info.get("Warnings"), Some(&json!(3)));
        assert!(snap.action.is_empty());
        assert!(snap.measure.is_empty());
        assert!(!snap.is_empty());
        assert!(snap.fetched_at.is_some());
    }

    #[test]
    fn absent_or_empty_payload_is_the_sentinel() {
        assert!(DeviceSnapshot::from_payload(None).is_empty());
        assert!(DeviceSnapshot::from_payload(Some(Payload::new())).is_empty());
        assert!(DeviceSnapshot::default().is_empty());
    }

    #[test]
    fn sentinel_differs_from_response_with_empty_sections() {
        let snap = snapshot(json!({"Header": {}}));
        assert!(!snap.is_empty());
        assert!(snap.header.is_empty());
    }

    #[test]
    fn non_object_sections_become_empty() {
        let snap = snapshot(json!({"Header": null, "Action": "control", "Info": [1]}));
        assert!(snap.header.is_empty());
        assert!(snap.action.is_empty());
        assert!(snap.info.is_empty());
    }

    #[test]
    fn mac_falls_back_to_alternate_spellings() {
        assert_eq!(
            snapshot(json!({"Header": {"MacAddress": "11:22"}})).mac(),
            Some("11:22")
        );
        assert_eq!(
            snapshot(json!({"Header": {"MacAdress": "", "DeviceId": "dev-7"}})).mac(),
            Some("dev-7")
        );
        assert_eq!(snapshot(json!({"Header": {}})).mac(), None);
    }

    #[test]
    fn device_type_accepts_numeric_strings() {
        assert_eq!(
            snapshot(json!({"Header": {"DeviceType": 106}})).device_type_code(),
            Some(106)
        );
        assert_eq!(
            snapshot(json!({"Header": {"DeviceType": "500"}})).device_type_code(),
            Some(500)
        );
        assert_eq!(
            snapshot(json!({"Header": {"DeviceType": true}})).device_type_code(),
            None
        );
    }

    #[test]
    fn fan_mode_prefers_automatic_then_sleep() {
        let auto = snapshot(json!({"Action": {"Automatic": true, "SleepMode": true}}));
        let sleep = snapshot(json!({"Action": {"SleepMode": 1, "FanSpeed": 3}}));
        let level = snapshot(json!({"Action": {"FanSpeed": 3}}));

        assert_eq!(auto.fan_mode(), FanMode::Auto);
        assert_eq!(sleep.fan_mode(), FanMode::Sleep);
        assert_eq!(level.fan_mode(), FanMode::Level(3));
    }
}
