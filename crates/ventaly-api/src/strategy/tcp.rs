// Raw TCP strategy for the V0 dialect.
//
// The appliance listens on a bare socket and expects a pseudo-HTTP request:
//
//   GET /Complete
//   Content-Length: 54
//   {"Header":{"Hash":"-42","DeviceName":"HomeAssistant"}}
//
// Each request opens its own connection, which the device closes after
// answering. The reply carries similar framing around a JSON body, so it is
// fed through the JSON recovery parser rather than parsed as HTTP.

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::Payload;
use crate::dialect::{Endpoint, HostEndpoint, HttpMethod};
use crate::error::Error;
use crate::json::first_json_object;
use crate::transport::TransportConfig;

const HANDSHAKE_HASH: &str = "-42";
const HANDSHAKE_DEVICE_NAME: &str = "HomeAssistant";

/// What the strategy knows about the device it is talking to.
///
/// Until the first status reply has been decoded the request header only
/// carries the handshake pair. Afterwards it also echoes the device's own
/// MAC and type code, which some firmware requires before accepting actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TcpIdentity {
    #[default]
    Unidentified,
    Identified {
        mac: String,
        device_type: i64,
    },
}

impl TcpIdentity {
    /// Build an identity from learned header fields. Both a MAC and a
    /// non-zero type code are needed; anything less stays unidentified.
    pub fn from_parts(mac: Option<&str>, device_type: i64) -> Self {
        match mac {
            Some(mac) if !mac.is_empty() && device_type != 0 => Self::Identified {
                mac: mac.to_owned(),
                device_type,
            },
            _ => Self::Unidentified,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Identified { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TcpHeader<'a> {
    hash: &'static str,
    device_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mac_address: Option<&'a str>,
}

#[derive(Serialize)]
struct TcpBody<'a> {
    #[serde(rename = "Header")]
    header: TcpHeader<'a>,
    #[serde(flatten)]
    action: Payload,
}

/// Hand-framed JSON exchange over a fresh TCP connection per request.
#[derive(Debug, Clone)]
pub struct TcpStrategy {
    endpoint: HostEndpoint,
    identity: TcpIdentity,
    transport: TransportConfig,
}

impl TcpStrategy {
    pub fn new(endpoint: HostEndpoint, transport: &TransportConfig) -> Self {
        Self {
            transport: transport.for_endpoint(&endpoint),
            endpoint,
            identity: TcpIdentity::Unidentified,
        }
    }

    pub fn endpoint(&self) -> &HostEndpoint {
        &self.endpoint
    }

    pub fn identity(&self) -> &TcpIdentity {
        &self.identity
    }

    /// Replace the identity echoed in every subsequent request header.
    pub fn set_identity(&mut self, identity: TcpIdentity) {
        debug!(host = %self.endpoint, ?identity, "tcp identity updated");
        self.identity = identity;
    }

    pub async fn get_status(&self, endpoint: Endpoint) -> Result<Option<Payload>, Error> {
        let message = self.build_message(endpoint.method, endpoint.path, None)?;
        self.send(endpoint, &message).await
    }

    pub async fn send_action(
        &self,
        endpoint: Endpoint,
        action: &Payload,
    ) -> Result<Option<Payload>, Error> {
        let message = self.build_message(endpoint.method, endpoint.path, Some(action))?;
        self.send(endpoint, &message).await
    }

    /// Render the wire message: request line, `Content-Length` line, then
    /// the compact JSON body. A `Header` key inside `action` is ignored; the
    /// strategy always supplies its own.
    pub fn build_message(
        &self,
        method: HttpMethod,
        path: &str,
        action: Option<&Payload>,
    ) -> Result<String, Error> {
        let (device_type, mac_address) = match &self.identity {
            TcpIdentity::Identified { mac, device_type } => (Some(*device_type), Some(mac.as_str())),
            TcpIdentity::Unidentified => (None, None),
        };

        let mut action = action.cloned().unwrap_or_default();
        action.remove("Header");

        let body = TcpBody {
            header: TcpHeader {
                hash: HANDSHAKE_HASH,
                device_name: HANDSHAKE_DEVICE_NAME,
                device_type,
                mac_address,
            },
            action,
        };
        let body = serde_json::to_string(&body).map_err(|e| Error::Parse {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?;

        Ok(format!(
            "{method} /{path}\nContent-Length: {}\n{body}",
            body.len()
        ))
    }

    async fn send(&self, endpoint: Endpoint, message: &str) -> Result<Option<Payload>, Error> {
        let what = format!("{} {}", endpoint.method, endpoint.path);
        self.transport
            .retry
            .run(&what, move || self.exchange(message))
            .await
    }

    async fn exchange(&self, message: &str) -> Result<Option<Payload>, Error> {
        let host = self.endpoint.address.as_str();
        let port = self.endpoint.port;

        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| socket_error(host, port, "connect to", e))?;

        debug!(host, port, request = message, "sending payload");
        stream
            .write_all(message.as_bytes())
            .await
            .map_err(|e| socket_error(host, port, "send to", e))?;

        let limit = u64::try_from(self.transport.tcp_buffer_limit).unwrap_or(u64::MAX);
        let mut raw = Vec::new();
        (&mut stream)
            .take(limit)
            .read_to_end(&mut raw)
            .await
            .map_err(|e| socket_error(host, port, "receive from", e))?;
        drop(stream);

        let text = String::from_utf8_lossy(&raw);
        let payload = text.trim();
        debug!(host, port, payload, "received payload");

        if payload.is_empty() {
            debug!(host, port, "empty response");
            return Ok(None);
        }

        match first_json_object(payload) {
            Some(object) => Ok(Some(object)),
            None => {
                debug!(host, port, payload, "malformed response");
                Err(Error::Parse {
                    message: format!("no JSON object in response from {host}:{port}"),
                    body: payload.to_owned(),
                })
            }
        }
    }
}

fn socket_error(host: &str, port: u16, stage: &'static str, source: std::io::Error) -> Error {
    let err = Error::socket(host, port, stage, source);
    warn!(error = %err, "socket failure");
    err
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn strategy() -> TcpStrategy {
        TcpStrategy::new(
            HostEndpoint::new("127.0.0.1", 48000, Duration::from_secs(1)),
            &TransportConfig::default(),
        )
    }

    fn body_of(message: &str) -> serde_json::Value {
        let body = message.splitn(3, '\n').nth(2).unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn status_message_before_identity_has_handshake_only() {
        let message = strategy()
            .build_message(HttpMethod::Get, "Complete", None)
            .unwrap();

        let body = r#"{"Header":{"Hash":"-42","DeviceName":"HomeAssistant"}}"#;
        assert_eq!(
            message,
            format!("GET /Complete\nContent-Length: {}\n{body}", body.len())
        );
        assert_eq!(
            body_of(&message),
            json!({"Header": {"Hash": "-42", "DeviceName": "HomeAssistant"}})
        );
    }

    #[test]
    fn identified_header_echoes_mac_and_type() {
        let mut strategy = strategy();
        strategy.set_identity(TcpIdentity::from_parts(Some("11:22:33:44:55:66"), 106));

        let message = strategy
            .build_message(HttpMethod::Get, "Complete", None)
            .unwrap();

        assert_eq!(
            body_of(&message),
            json!({"Header": {
                "Hash": "-42",
                "DeviceName": "HomeAssistant",
                "DeviceType": 106,
                "MacAddress": "11:22:33:44:55:66"
            }})
        );
        let raw_body = message.splitn(3, '\n').nth(2).unwrap();
        assert!(!raw_body.contains(' '));
    }

    #[test]
    fn action_fields_sit_beside_the_header() {
        let action = json!({"Action": {"Power": true}, "Header": {"Hash": "spoofed"}});
        let action = action.as_object().unwrap();

        let message = strategy()
            .build_message(HttpMethod::Post, "Action", Some(action))
            .unwrap();

        assert!(message.starts_with("POST /Action\nContent-Length: "));
        assert_eq!(
            body_of(&message),
            json!({
                "Header": {"Hash": "-42", "DeviceName": "HomeAssistant"},
                "Action": {"Power": true}
            })
        );
    }

    #[test]
    fn content_length_counts_body_bytes() {
        let message = strategy()
            .build_message(HttpMethod::Get, "Complete", None)
            .unwrap();
        let mut lines = message.splitn(3, '\n');
        lines.next();
        let declared: usize = lines
            .next()
            .unwrap()
            .trim_start_matches("Content-Length: ")
            .parse()
            .unwrap();
        assert_eq!(declared, lines.next().unwrap().len());
    }

    #[test]
    fn partial_identity_stays_unidentified() {
        assert_eq!(TcpIdentity::from_parts(None, 106), TcpIdentity::Unidentified);
        assert_eq!(TcpIdentity::from_parts(Some(""), 106), TcpIdentity::Unidentified);
        assert_eq!(
            TcpIdentity::from_parts(Some("11:22:33:44:55:66"), 0),
            TcpIdentity::Unidentified
        );
        assert!(TcpIdentity::from_parts(Some("11:22:33:44:55:66"), 3).is_identified());
    }
}
