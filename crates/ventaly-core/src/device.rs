// ── Device ──
//
// One appliance at one address. Owns dialect selection and the strategy it
// implies, learns the device's identity from its first status reply, and
// maps every reply into a `DeviceSnapshot`.

use tracing::{Instrument, Span, debug, info, info_span, warn};
use ventaly_api::{
    ApiVersion, DialectDefinition, HostEndpoint, Payload, Strategy, TcpIdentity, TransportConfig,
};

use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::model::{DeviceIdentity, DeviceSnapshot, DeviceType};

/// A Venta appliance and the dialect used to talk to it.
///
/// Starts unconfigured unless the config carries a persisted dialect id.
/// [`detect_api`](Self::detect_api) or [`set_dialect`](Self::set_dialect)
/// configure it; [`init`](Self::init) then learns its identity.
#[derive(Debug)]
pub struct Device {
    config: DeviceConfig,
    active: Option<Active>,
    identity: Option<DeviceIdentity>,
    span: Span,
}

#[derive(Debug)]
struct Active {
    dialect: &'static DialectDefinition,
    strategy: Strategy,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Result<Self, CoreError> {
        let span = info_span!("device", host = %config.host);
        let mut device = Self {
            config,
            active: None,
            identity: None,
            span,
        };

        if let Some(id) = device.config.dialect_id.clone() {
            let dialect = DialectDefinition::from_id(&id)
                .ok_or(CoreError::UnknownDialect { id })?;
            device.set_dialect(dialect)?;
        }

        Ok(device)
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn dialect(&self) -> Option<&'static DialectDefinition> {
        self.active.as_ref().map(|a| a.dialect)
    }

    pub fn api_version(&self) -> Option<ApiVersion> {
        self.dialect().map(|d| d.version)
    }

    /// Identity learned by the last [`init`](Self::init).
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn mac(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.mac.as_deref())
    }

    pub fn device_type(&self) -> DeviceType {
        self.identity
            .as_ref()
            .map_or(DeviceType::Unknown, |i| i.device_type)
    }

    /// Header fields the raw TCP strategy echoes, once learned.
    pub fn tcp_identity(&self) -> Option<&TcpIdentity> {
        self.active.as_ref().and_then(|a| a.strategy.tcp_identity())
    }

    // ── Dialect selection ────────────────────────────────────────────

    /// Switch to `dialect`, replacing the strategy. Only the learned MAC
    /// and type code carry over, for the TCP request header.
    pub fn set_dialect(&mut self, dialect: &'static DialectDefinition) -> Result<(), CoreError> {
        let mut strategy = Strategy::for_dialect(
            dialect,
            self.endpoint(dialect, self.config.transport.timeout),
            &self.config.transport,
            self.config.http_client.as_ref(),
        )?;
        if let Some(identity) = &self.identity {
            strategy.set_tcp_identity(identity.tcp_identity());
        }

        debug!(parent: &self.span, dialect = %dialect, "dialect selected");
        self.active = Some(Active { dialect, strategy });
        Ok(())
    }

    /// Try the known dialects in order, optionally restricted to one
    /// version, and keep the first whose reply carries a `Header`.
    ///
    /// Each attempt uses a short single-attempt budget. Failing dialects are
    /// skipped; running out of candidates is an error and nothing is
    /// guessed.
    pub async fn detect_api(
        &mut self,
        version: Option<ApiVersion>,
    ) -> Result<&'static DialectDefinition, CoreError> {
        let span = self.span.clone();
        let found = self.try_dialects(version).instrument(span).await;

        match found {
            Some(dialect) => {
                self.set_dialect(dialect)?;
                info!(parent: &self.span, dialect = %dialect, "api dialect detected");
                Ok(dialect)
            }
            None => {
                warn!(parent: &self.span, ?version, "no dialect answered");
                Err(CoreError::ApiVersionDetection {
                    host: self.config.host.clone(),
                })
            }
        }
    }

    async fn try_dialects(&self, version: Option<ApiVersion>) -> Option<&'static DialectDefinition> {
        let timeout = self.config.detect_timeout;
        let transport = TransportConfig::detection(timeout);

        for dialect in DialectDefinition::candidates(version) {
            let candidate = match Strategy::for_dialect(
                dialect,
                self.endpoint(dialect, timeout),
                &transport,
                self.config.http_client.as_ref(),
            ) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!(dialect = %dialect, error = %e, "cannot build strategy");
                    continue;
                }
            };

            debug!(dialect = %dialect, "trying dialect");
            match tokio::time::timeout(timeout, candidate.get_status(dialect.status)).await {
                Ok(Ok(Some(payload))) if has_header(&payload) => return Some(dialect),
                Ok(Ok(_)) => {
                    debug!(dialect = %dialect, "answered without a header");
                    tokio::time::sleep(self.config.detect_delay).await;
                }
                Ok(Err(e)) => debug!(dialect = %dialect, error = %e, "dialect failed"),
                Err(_) => debug!(dialect = %dialect, "dialect timed out"),
            }
        }
        None
    }

    // ── Status and actions ───────────────────────────────────────────

    /// Fetch status once and learn the device's identity from the header.
    /// On the raw TCP dialect the strategy starts echoing it back.
    pub async fn init(&mut self) -> Result<DeviceSnapshot, CoreError> {
        let snapshot = self.status().await?;
        if snapshot.is_empty() {
            return Err(CoreError::ConnectionFailed {
                host: self.config.host.clone(),
                reason: "device returned no data".into(),
            });
        }

        let active = self.active.as_mut().ok_or_else(|| not_configured(&self.config.host))?;
        let identity = DeviceIdentity::from_snapshot(&self.config.host, active.dialect, &snapshot);

        if active.dialect.version.is_raw_tcp() {
            active.strategy.set_tcp_identity(identity.tcp_identity());
        }

        info!(
            parent: &self.span,
            mac = identity.mac.as_deref().unwrap_or("?"),
            model = %identity.device_type,
            code = ?identity.device_type_code,
            "device initialized"
        );
        self.identity = Some(identity);
        Ok(snapshot)
    }

    /// Current device state. The sentinel snapshot means no data arrived.
    pub async fn status(&self) -> Result<DeviceSnapshot, CoreError> {
        let active = self.active()?;
        let payload = active
            .strategy
            .get_status(active.dialect.status)
            .instrument(self.span.clone())
            .await?;
        Ok(DeviceSnapshot::from_payload(payload))
    }

    /// Send a pre-rendered action body. Fails without any I/O when the
    /// active dialect is read-only.
    pub async fn action(&self, body: &Payload) -> Result<DeviceSnapshot, CoreError> {
        let active = self.active()?;
        let Some(endpoint) = active.dialect.action else {
            return Err(CoreError::Unsupported {
                operation: "action".into(),
                reason: format!("dialect {} is read-only", active.dialect),
            });
        };

        let payload = active
            .strategy
            .send_action(endpoint, body)
            .instrument(self.span.clone())
            .await?;
        Ok(DeviceSnapshot::from_payload(payload))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn active(&self) -> Result<&Active, CoreError> {
        self.active
            .as_ref()
            .ok_or_else(|| not_configured(&self.config.host))
    }

    fn endpoint(&self, dialect: &DialectDefinition, timeout: std::time::Duration) -> HostEndpoint {
        HostEndpoint::new(
            self.config.host.clone(),
            self.config.port.unwrap_or(dialect.port),
            timeout,
        )
    }
}

fn has_header(payload: &Payload) -> bool {
    payload.get("Header").is_some_and(|h| !h.is_null())
}

fn not_configured(host: &str) -> CoreError {
    CoreError::NotConfigured {
        message: format!("no API dialect selected for {host}; run detection first"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_persisted_dialect_is_rejected() {
        let err = Device::new(DeviceConfig::new("10.0.0.2").with_dialect("9/bogus/None")).unwrap_err();
        assert!(matches!(err, CoreError::UnknownDialect { ref id } if id == "9/bogus/None"));
    }

    #[test]
    fn persisted_dialect_configures_immediately() {
        let device =
            Device::new(DeviceConfig::new("10.0.0.2").with_dialect("0/Complete/Action")).unwrap();
        assert_eq!(device.api_version(), Some(ApiVersion::V0));
        assert_eq!(device.tcp_identity(), Some(&TcpIdentity::Unidentified));
    }

    #[tokio::test]
    async fn status_before_detection_is_not_configured() {
        let device = Device::new(DeviceConfig::new("10.0.0.2")).unwrap();
        assert!(matches!(
            device.status().await,
            Err(CoreError::NotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn action_on_read_only_dialect_is_unsupported() {
        let device =
            Device::new(DeviceConfig::new("10.0.0.2").with_dialect("3/sensordata.json/None")).unwrap();
        let body = json!({"Power": true}).as_object().cloned().unwrap();

        assert!(matches!(
            device.action(&body).await,
            Err(CoreError::Unsupported { .. })
        ));
    }

    #[test]
    fn header_must_be_present_and_non_null() {
        let with = json!({"Header": {}}).as_object().cloned().unwrap();
        let null = json!({"Header": null}).as_object().cloned().unwrap();
        let without = json!({"Info": {}}).as_object().cloned().unwrap();

        assert!(has_header(&with));
        assert!(!has_header(&null));
        assert!(!has_header(&without));
    }
}
