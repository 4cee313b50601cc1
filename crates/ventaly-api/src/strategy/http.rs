// HTTP strategy for the V2 and V3 dialects.
//
// One reqwest::Client per strategy, created on first use unless the caller
// hands one in. Bodies are decoded as JSON whatever the device claims the
// content type is, and the status code is ignored: a decoded object is the
// success signal.

use tokio::sync::OnceCell;
use tracing::{debug, trace};
use url::Url;

use crate::Payload;
use crate::dialect::{Endpoint, HostEndpoint, HttpMethod};
use crate::error::Error;
use crate::transport::TransportConfig;

/// JSON-over-HTTP exchange with a single appliance.
#[derive(Debug)]
pub struct HttpStrategy {
    endpoint: HostEndpoint,
    base_url: Url,
    http: OnceCell<reqwest::Client>,
    transport: TransportConfig,
}

impl HttpStrategy {
    /// Create a strategy that builds its own client on first request.
    pub fn new(endpoint: HostEndpoint, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            base_url: base_url(&endpoint)?,
            transport: transport.for_endpoint(&endpoint),
            endpoint,
            http: OnceCell::new(),
        })
    }

    /// Create a strategy sharing an existing client (and its pool).
    pub fn with_client(
        endpoint: HostEndpoint,
        http: reqwest::Client,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            base_url: base_url(&endpoint)?,
            transport: transport.for_endpoint(&endpoint),
            endpoint,
            http: OnceCell::new_with(Some(http)),
        })
    }

    pub fn endpoint(&self) -> &HostEndpoint {
        &self.endpoint
    }

    /// Fetch the device status. `Ok(None)` means the device sent nothing
    /// usable (empty body, or every attempt timed out).
    pub async fn get_status(&self, endpoint: Endpoint) -> Result<Option<Payload>, Error> {
        self.send(endpoint, None).await
    }

    /// Send an action body and return whatever state the device echoes.
    pub async fn send_action(
        &self,
        endpoint: Endpoint,
        body: &Payload,
    ) -> Result<Option<Payload>, Error> {
        self.send(endpoint, Some(body)).await
    }

    async fn send(&self, endpoint: Endpoint, body: Option<&Payload>) -> Result<Option<Payload>, Error> {
        let url = self.base_url.join(endpoint.path)?;
        let what = format!("{} {}", endpoint.method, endpoint.path);

        self.transport
            .retry
            .run(&what, move || self.exchange(endpoint.method, url.clone(), body))
            .await
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<&Payload>,
    ) -> Result<Option<Payload>, Error> {
        let http = self
            .http
            .get_or_try_init(|| async { self.transport.build_client() })
            .await?;

        debug!("{} {}", method, url);

        let mut request = http.request(method.into(), url);
        if let Some(body) = body {
            trace!(body = %serde_json::Value::Object(body.clone()), "request body");
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        trace!(%status, len = bytes.len(), "received response");

        decode_body(&bytes)
    }
}

fn base_url(endpoint: &HostEndpoint) -> Result<Url, Error> {
    let host = &endpoint.address;
    let raw = if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{}/", endpoint.port)
    } else {
        format!("http://{host}:{}/", endpoint.port)
    };
    Ok(Url::parse(&raw)?)
}

/// Decode a response body into a JSON object.
fn decode_body(bytes: &[u8]) -> Result<Option<Payload>, Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("empty response body");
        return Ok(None);
    }

    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(other) => {
            let body = other.to_string();
            debug!(%body, "response is not a JSON object");
            Err(Error::Parse {
                message: "expected a JSON object".into(),
                body,
            })
        }
        Err(e) => {
            let body = String::from_utf8_lossy(bytes).into_owned();
            debug!(%body, error = %e, "unparseable response");
            Err(Error::Parse {
                message: e.to_string(),
                body,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn base_url_brackets_ipv6_hosts() {
        let v4 = HostEndpoint::new("192.168.1.40", 80, Duration::from_secs(1));
        let v6 = HostEndpoint::new("fe80::1", 80, Duration::from_secs(1));
        assert_eq!(base_url(&v4).unwrap().as_str(), "http://192.168.1.40/");
        assert_eq!(base_url(&v6).unwrap().as_str(), "http://[fe80::1]/");
    }

    #[test]
    fn action_path_keeps_its_query() {
        let url = base_url(&HostEndpoint::new("10.0.0.5", 8080, Duration::from_secs(1)))
            .unwrap()
            .join("api/telemetry?request=set")
            .unwrap();
        assert_eq!(url.path(), "/api/telemetry");
        assert_eq!(url.query(), Some("request=set"));
    }

    #[test]
    fn whitespace_body_is_no_result() {
        assert!(decode_body(b"").unwrap().is_none());
        assert!(decode_body(b" \r\n").unwrap().is_none());
    }

    #[test]
    fn non_object_body_is_a_parse_error() {
        assert!(decode_body(b"[1,2]").unwrap_err().is_parse());
        assert!(decode_body(b"<html>").unwrap_err().is_parse());
    }
}
