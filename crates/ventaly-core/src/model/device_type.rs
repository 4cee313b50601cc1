use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use super::capabilities::{self, Capabilities};

/// Known Venta models, keyed by the numeric `DeviceType` header code.
///
/// Unrecognised codes resolve to [`DeviceType::Unknown`] rather than
/// failing, so new firmware still gets a working status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum DeviceType {
    #[strum(serialize = "Unknown")]
    Unknown,
    #[strum(serialize = "LP60")]
    Lp60,
    #[strum(serialize = "LW60")]
    Lw60,
    #[strum(serialize = "LW60-T")]
    Lw60T,
    #[strum(serialize = "LW62-T")]
    Lw62T,
    #[strum(serialize = "AP902")]
    Ap902,
    #[strum(serialize = "AH902")]
    Ah902,
    #[strum(serialize = "AS100")]
    As100,
    #[strum(serialize = "LW73/LW74")]
    Lw73Lw74,
    #[strum(serialize = "AS150")]
    As150,
    #[strum(serialize = "AH550/AH555")]
    Ah550Ah555,
}

impl DeviceType {
    /// The wire code for this model. `Unknown` reports -1.
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => -1,
            Self::Lp60 => 1,
            Self::Lw60 => 2,
            Self::Lw60T => 3,
            Self::Lw62T => 6,
            Self::Ap902 => 11,
            Self::Ah902 => 12,
            Self::As100 => 100,
            Self::Lw73Lw74 => 106,
            Self::As150 => 150,
            Self::Ah550Ah555 => 500,
        }
    }

    /// Resolve a wire code. Never fails.
    pub fn from_code(code: i64) -> Self {
        Self::iter()
            .find(|t| *t != Self::Unknown && t.code() == code)
            .unwrap_or(Self::Unknown)
    }

    /// Resolve an optional code from a header that may omit it.
    pub fn from_optional_code(code: Option<i64>) -> Self {
        code.map_or(Self::Unknown, Self::from_code)
    }

    /// Display name, e.g. `LW73/LW74`.
    pub fn model_name(self) -> &'static str {
        self.into()
    }

    /// Air-quality sensors expose measurements only.
    pub fn is_sensor(self) -> bool {
        matches!(self, Self::As100 | Self::As150)
    }

    pub fn capabilities(self) -> &'static Capabilities {
        capabilities::for_device(self)
    }
}
