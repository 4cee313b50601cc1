use serde::Serialize;
use ventaly_api::{ApiVersion, DialectDefinition, TcpIdentity};

use super::device_type::DeviceType;
use super::snapshot::DeviceSnapshot;

/// What the device told us about itself during init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub host: String,
    pub mac: Option<String>,
    /// Raw header code; `None` when the header omits it.
    pub device_type_code: Option<i64>,
    pub device_type: DeviceType,
    pub dialect: &'static DialectDefinition,
}

impl DeviceIdentity {
    pub(crate) fn from_snapshot(
        host: &str,
        dialect: &'static DialectDefinition,
        snapshot: &DeviceSnapshot,
    ) -> Self {
        let device_type_code = snapshot.device_type_code();
        Self {
            host: host.to_owned(),
            mac: snapshot.mac().map(String::from),
            device_type_code,
            device_type: DeviceType::from_optional_code(device_type_code),
            dialect,
        }
    }

    pub fn api_version(&self) -> ApiVersion {
        self.dialect.version
    }

    /// Header fields the raw TCP dialect echoes back to the device.
    pub fn tcp_identity(&self) -> TcpIdentity {
        TcpIdentity::from_parts(self.mac.as_deref(), self.device_type_code.unwrap_or(0))
    }
}

/// Registry-style summary of a device, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: &'static str,
    pub name: String,
    pub model: &'static str,
    pub mac: Option<String>,
    pub sw_version: Option<String>,
    pub api_definition: String,
    #[serde(skip)]
    pub device_type: DeviceType,
}

impl DeviceInfo {
    pub fn new(identity: &DeviceIdentity, snapshot: &DeviceSnapshot) -> Self {
        let model = identity.device_type.model_name();
        Self {
            manufacturer: "Venta",
            name: format!("Venta {model}"),
            model,
            mac: identity.mac.clone(),
            sw_version: snapshot.sw_version().map(String::from),
            api_definition: identity.dialect.id(),
            device_type: identity.device_type,
        }
    }
}
