// ── Wire dialects ──
//
// One entry per firmware generation: HTTP method, path and port for the
// status and action endpoints. The table order is the detection order,
// newest first, with the raw TCP dialect last since trying it is slowest.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Venta protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ApiVersion {
    /// Raw TCP on port 48000 (LW60-T, LW62-T and older).
    V0,
    /// HTTP `datastructure` endpoint.
    V2,
    /// HTTP `api/telemetry` / `sensordata.json` endpoints.
    V3,
}

impl ApiVersion {
    pub fn number(self) -> u8 {
        match self {
            Self::V0 => 0,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Whether this generation speaks hand-framed TCP instead of HTTP.
    pub fn is_raw_tcp(self) -> bool {
        matches!(self, Self::V0)
    }
}

impl TryFrom<u8> for ApiVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::V0),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(format!("unknown API version {other} (expected 0, 2 or 3)")),
        }
    }
}

impl From<ApiVersion> for u8 {
    fn from(version: ApiVersion) -> Self {
        version.number()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Request method used on the wire. Venta firmware only knows these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single device endpoint: method plus path relative to the host root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: &'static str,
}

/// One self-consistent combination of wire format, port and endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialectDefinition {
    pub version: ApiVersion,
    pub status: Endpoint,
    /// `None` for read-only dialects (the V3 air-quality sensors).
    pub action: Option<Endpoint>,
    pub port: u16,
}

const HTTP_PORT: u16 = 80;
const TCP_PORT: u16 = 48000;

/// Every supported dialect, in detection precedence order.
pub static DIALECTS: [DialectDefinition; 4] = [
    DialectDefinition {
        version: ApiVersion::V3,
        status: Endpoint {
            method: HttpMethod::Post,
            path: "api/telemetry",
        },
        action: Some(Endpoint {
            method: HttpMethod::Post,
            path: "api/telemetry?request=set",
        }),
        port: HTTP_PORT,
    },
    DialectDefinition {
        version: ApiVersion::V3,
        status: Endpoint {
            method: HttpMethod::Get,
            path: "sensordata.json",
        },
        action: None,
        port: HTTP_PORT,
    },
    DialectDefinition {
        version: ApiVersion::V2,
        status: Endpoint {
            method: HttpMethod::Post,
            path: "datastructure",
        },
        action: Some(Endpoint {
            method: HttpMethod::Post,
            path: "datastructure",
        }),
        port: HTTP_PORT,
    },
    DialectDefinition {
        version: ApiVersion::V0,
        status: Endpoint {
            method: HttpMethod::Get,
            path: "Complete",
        },
        action: Some(Endpoint {
            method: HttpMethod::Post,
            path: "Action",
        }),
        port: TCP_PORT,
    },
];

impl DialectDefinition {
    /// Stable identity persisted across restarts:
    /// `"<version>/<status path>/<action path or None>"`.
    pub fn id(&self) -> String {
        let action = self.action.map_or("None", |a| a.path);
        format!("{}/{}/{action}", self.version.number(), self.status.path)
    }

    /// Resolve a persisted identity back to its table entry.
    pub fn from_id(id: &str) -> Option<&'static Self> {
        DIALECTS.iter().find(|d| d.id() == id)
    }

    /// Dialects to try during detection, optionally restricted to one version.
    pub fn candidates(
        version: Option<ApiVersion>,
    ) -> impl Iterator<Item = &'static DialectDefinition> {
        DIALECTS
            .iter()
            .filter(move |d| version.is_none_or(|v| d.version == v))
    }

    pub fn supports_action(&self) -> bool {
        self.action.is_some()
    }
}

impl fmt::Display for DialectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Where and how long to talk to a device. Immutable per strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    pub address: String,
    pub port: u16,
    pub timeout: Duration,
}

impl HostEndpoint {
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            timeout,
        }
    }
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identities_match_persisted_format() {
        let ids: Vec<String> = DIALECTS.iter().map(DialectDefinition::id).collect();
        assert_eq!(
            ids,
            vec![
                "3/api/telemetry/api/telemetry?request=set",
                "3/sensordata.json/None",
                "2/datastructure/datastructure",
                "0/Complete/Action",
            ]
        );
    }

    #[test]
    fn from_id_round_trips_every_dialect() {
        for dialect in &DIALECTS {
            assert_eq!(DialectDefinition::from_id(&dialect.id()), Some(dialect));
        }
        assert!(DialectDefinition::from_id("9/nope/None").is_none());
    }

    #[test]
    fn candidates_filter_by_version_and_keep_order() {
        let v3: Vec<_> = DialectDefinition::candidates(Some(ApiVersion::V3)).collect();
        assert_eq!(v3.len(), 2);
        assert_eq!(v3[0].status.path, "api/telemetry");
        assert_eq!(v3[1].status.path, "sensordata.json");

        let all: Vec<_> = DialectDefinition::candidates(None).collect();
        assert_eq!(all.len(), DIALECTS.len());
        assert!(all.last().unwrap().version.is_raw_tcp());
    }

    #[test]
    fn raw_tcp_dialect_uses_its_own_port() {
        let v0 = DialectDefinition::candidates(Some(ApiVersion::V0))
            .next()
            .unwrap();
        assert_eq!(v0.port, 48000);
        assert!(DIALECTS.iter().filter(|d| d.port == 80).count() == 3);
    }

    #[test]
    fn sensor_dialect_is_read_only() {
        let sensor = DialectDefinition::from_id("3/sensordata.json/None").unwrap();
        assert!(!sensor.supports_action());
    }

    #[test]
    fn api_version_parses_from_number() {
        assert_eq!(ApiVersion::try_from(2).unwrap(), ApiVersion::V2);
        assert!(ApiVersion::try_from(1).is_err());
    }
}
