// ── Per-model capability registry ──
//
// What each model can do: fan modes, warning bits and maintenance
// counters. Resolved once from the device type after init.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use ventaly_api::Payload;

use super::device_type::DeviceType;
use crate::maintenance::{CounterSpec, TickResolution, lifetime, skip_zeros};

/// A selectable fan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FanMode {
    Auto,
    Sleep,
    Boost,
    Level(u8),
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Sleep => f.write_str("sleep"),
            Self::Boost => f.write_str("boost"),
            Self::Level(n) => write!(f, "level {n}"),
        }
    }
}

impl FromStr for FanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sleep" => Ok(Self::Sleep),
            "boost" => Ok(Self::Boost),
            other => other
                .trim_start_matches("level")
                .trim()
                .parse()
                .map(Self::Level)
                .map_err(|_| format!("unknown fan mode: {s}")),
        }
    }
}

/// One bit of the `Info.Warnings` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarningBit {
    pub name: &'static str,
    pub mask: u64,
}

const fn bit(name: &'static str, mask: u64) -> WarningBit {
    WarningBit { name, mask }
}

/// Capability descriptor for one model.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub fan_modes: &'static [FanMode],
    pub warnings: &'static [WarningBit],
    pub counters: &'static [CounterSpec],
    pub led_strip: bool,
    /// Accepts the `Timer` switch-off setting.
    pub timer: bool,
    /// `Measure` keys that read 0 while the sensor warms up.
    pub idle_zero_measures: &'static [&'static str],
}

impl Capabilities {
    /// Names of the warning bits set in `mask`.
    pub fn active_warnings(&self, mask: u64) -> Vec<&'static str> {
        self.warnings
            .iter()
            .filter(|w| mask & w.mask != 0)
            .map(|w| w.name)
            .collect()
    }

    pub fn supports_fan_mode(&self, mode: FanMode) -> bool {
        self.fan_modes.contains(&mode)
    }

    pub fn is_read_only(&self) -> bool {
        self.fan_modes.is_empty()
    }

    /// A `Measure` value, treating idle zeros as absent.
    pub fn measure<'a>(&self, measure: &'a Payload, key: &str) -> Option<&'a Value> {
        let value = measure.get(key);
        if self.idle_zero_measures.iter().any(|k| *k == key) {
            skip_zeros(value)
        } else {
            value
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────────

use FanMode::{Auto, Boost, Level, Sleep};
use TickResolution::{FiveMinutes, OneMinute, TenMinutes};

const MODES_GENERIC: &[FanMode] = &[Auto, Sleep, Level(1), Level(2), Level(3), Level(4)];
const MODES_SLEEP_4: &[FanMode] = &[Sleep, Level(1), Level(2), Level(3), Level(4)];
const MODES_SLEEP_5: &[FanMode] = &[Sleep, Level(1), Level(2), Level(3), Level(4), Level(5)];
const MODES_LP60: &[FanMode] = &[Sleep, Boost, Level(1), Level(2), Level(3), Level(4), Level(5)];
const MODES_AUTO_3: &[FanMode] = &[Auto, Level(1), Level(2), Level(3)];

const SENSOR_MEASURES: &[&str] = &["Co2", "Voc", "Hcho"];

const TIMER: CounterSpec = CounterSpec::new("TimerT", "Timer", OneMinute);
const OPERATION_5: CounterSpec = CounterSpec::new("OperationT", "Operation time", FiveMinutes);
const DISC_ION: CounterSpec =
    CounterSpec::new("DiscIonT", "Ion disc", FiveMinutes).lifetime(lifetime::ION_DISC_DAYS);
const CLEANING: CounterSpec =
    CounterSpec::new("CleaningT", "Cleaning", FiveMinutes).lifetime(lifetime::CLEANING_DAYS);
const FILTER_10: CounterSpec = CounterSpec::new("FilterT", "Filter", TenMinutes);
const UVC_ON: CounterSpec = CounterSpec::new("UVCOnT", "UV-C on", OneMinute);
const UVC_OFF: CounterSpec = CounterSpec::new("UVCOffT", "UV-C off", OneMinute);

static GENERIC: Capabilities = Capabilities {
    fan_modes: MODES_GENERIC,
    warnings: &[],
    counters: &[],
    led_strip: false,
    timer: false,
    idle_zero_measures: &[],
};

static SENSOR: Capabilities = Capabilities {
    fan_modes: &[],
    warnings: &[],
    counters: &[],
    led_strip: false,
    timer: false,
    idle_zero_measures: SENSOR_MEASURES,
};

static LP60: Capabilities = Capabilities {
    fan_modes: MODES_LP60,
    warnings: &[bit("filter", 16)],
    counters: &[TIMER, OPERATION_5, FILTER_10],
    led_strip: false,
    timer: true,
    idle_zero_measures: &[],
};

static AP902: Capabilities = Capabilities {
    fan_modes: MODES_SLEEP_5,
    warnings: &[bit("filter", 16)],
    counters: &[TIMER, OPERATION_5, FILTER_10],
    led_strip: false,
    timer: true,
    idle_zero_measures: &[],
};

static LW60T: Capabilities = Capabilities {
    fan_modes: MODES_SLEEP_5,
    warnings: &[
        bit("fill tank (red)", 1),
        bit("fill tank (yellow)", 2),
        bit("close door", 4),
        bit("filter", 16),
        bit("ion disc", 32),
        bit("cleaning", 64),
        bit("water inlet", 128),
    ],
    counters: &[
        TIMER,
        OPERATION_5,
        DISC_ION,
        CLEANING,
        CounterSpec::new("CleaningR", "Cleaning run", OneMinute),
    ],
    led_strip: false,
    timer: true,
    idle_zero_measures: &[],
};

static LW62T: Capabilities = Capabilities {
    fan_modes: MODES_SLEEP_5,
    warnings: &[
        bit("fill tank (red)", 1),
        bit("fill tank (yellow)", 2),
        bit("close door", 4),
        bit("filter", 16),
        bit("ion disc", 32),
        bit("cleaning", 64),
    ],
    counters: &[TIMER, OPERATION_5, DISC_ION, CLEANING, UVC_ON, UVC_OFF],
    led_strip: false,
    timer: true,
    idle_zero_measures: &[],
};

static AH902: Capabilities = Capabilities {
    fan_modes: MODES_SLEEP_5,
    warnings: &[
        bit("fill tank (red)", 1),
        bit("fill tank (yellow)", 2),
        bit("close door", 4),
        bit("filter", 16),
        bit("ion disc", 32),
        bit("cleaning", 64),
        bit("service", 256),
    ],
    counters: &[
        TIMER,
        OPERATION_5,
        DISC_ION,
        CLEANING,
        FILTER_10,
        CounterSpec::new("ServiceT", "Service", FiveMinutes),
        UVC_ON,
        UVC_OFF,
    ],
    led_strip: false,
    timer: false,
    idle_zero_measures: &[],
};

static LW73_LW74: Capabilities = Capabilities {
    fan_modes: MODES_SLEEP_4,
    warnings: &[
        bit("water", 1),
        bit("ion disc", 2),
        bit("cleaning", 4),
        bit("filter", 8),
        bit("service", 16),
    ],
    counters: &[
        OPERATION_5,
        DISC_ION,
        CLEANING,
        CounterSpec::new("ServiceT", "Service", TenMinutes).lifetime(lifetime::SERVICE_DAYS),
        // Reported as always zero on current firmware.
        CounterSpec::new("FilterT", "Filter", TenMinutes).suspect(),
    ],
    led_strip: true,
    timer: false,
    idle_zero_measures: &[],
};

static AH550_AH555: Capabilities = Capabilities {
    fan_modes: MODES_AUTO_3,
    warnings: &[
        bit("water", 1),
        bit("service", 2),
        bit("box open", 4),
        bit("fan blocked", 8),
    ],
    counters: &[
        CounterSpec::new("OperationT", "Operation time", TenMinutes),
        CounterSpec::new("ServiceT", "Service", TenMinutes).lifetime(lifetime::SERVICE_DAYS),
    ],
    led_strip: false,
    timer: false,
    idle_zero_measures: &[],
};

pub(crate) fn for_device(device_type: DeviceType) -> &'static Capabilities {
    match device_type {
        DeviceType::Lp60 => &LP60,
        DeviceType::Ap902 => &AP902,
        DeviceType::Lw60T => &LW60T,
        DeviceType::Lw62T => &LW62T,
        DeviceType::Ah902 => &AH902,
        DeviceType::Lw73Lw74 => &LW73_LW74,
        DeviceType::Ah550Ah555 => &AH550_AH555,
        DeviceType::As100 | DeviceType::As150 => &SENSOR,
        DeviceType::Unknown | DeviceType::Lw60 => &GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lw73_warning_bits() {
        let caps = DeviceType::Lw73Lw74.capabilities();
        assert_eq!(caps.active_warnings(1 | 4 | 16), vec!["water", "cleaning", "service"]);
        assert!(caps.active_warnings(0).is_empty());
    }

    #[test]
    fn lw73_filter_counter_is_flagged() {
        let caps = DeviceType::Lw73Lw74.capabilities();
        let filter = caps.counters.iter().find(|c| c.field == "FilterT");
        assert!(filter.is_some_and(|c| c.suspect));
        assert!(caps.counters.iter().filter(|c| c.suspect).count() == 1);
    }

    #[test]
    fn sensors_are_read_only() {
        assert!(DeviceType::As150.capabilities().is_read_only());
        assert!(!DeviceType::Unknown.capabilities().is_read_only());
    }

    #[test]
    fn fan_modes_parse_and_display() {
        assert_eq!("level 3".parse::<FanMode>(), Ok(FanMode::Level(3)));
        assert_eq!("3".parse::<FanMode>(), Ok(FanMode::Level(3)));
        assert_eq!("Auto".parse::<FanMode>(), Ok(FanMode::Auto));
        assert!("turbo".parse::<FanMode>().is_err());
        assert_eq!(FanMode::Level(2).to_string(), "level 2");
    }

    #[test]
    fn ah550_supports_auto_but_not_sleep() {
        let caps = DeviceType::Ah550Ah555.capabilities();
        assert!(caps.supports_fan_mode(FanMode::Auto));
        assert!(!caps.supports_fan_mode(FanMode::Sleep));
    }

    #[test]
    fn sensor_idle_zeros_read_as_absent() {
        let measure = json!({"Co2": 0, "Voc": 112, "Temperature": 0})
            .as_object()
            .cloned()
            .unwrap_or_default();

        let sensor = DeviceType::As100.capabilities();
        assert_eq!(sensor.measure(&measure, "Co2"), None);
        assert_eq!(sensor.measure(&measure, "Voc"), Some(&json!(112)));
        assert_eq!(sensor.measure(&measure, "Temperature"), Some(&json!(0)));

        let humidifier = DeviceType::Lw73Lw74.capabilities();
        assert_eq!(humidifier.measure(&measure, "Co2"), Some(&json!(0)));
    }

    #[test]
    fn led_strip_and_timer_per_model() {
        assert!(DeviceType::Lw73Lw74.capabilities().led_strip);
        assert!(!DeviceType::Lw73Lw74.capabilities().timer);
        assert!(DeviceType::Lw62T.capabilities().timer);
        assert!(DeviceType::Lp60.capabilities().timer);
        assert!(!DeviceType::Ah550Ah555.capabilities().led_strip);
    }
}
