// ── Runtime device configuration ──
//
// These types describe how to reach one appliance and how often to poll
// it. They never touch disk: the CLI (or any other host) builds them from
// its own settings and hands them in.

use std::time::Duration;

use tracing::warn;
use ventaly_api::TransportConfig;

/// Shortest polling interval the coordinator accepts.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// How to reach a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Hostname or IP address.
    pub host: String,
    /// Overrides every dialect's default port when set.
    pub port: Option<u16>,
    /// Persisted dialect identity from an earlier detection.
    pub dialect_id: Option<String>,
    pub transport: TransportConfig,
    /// Shared HTTP client; each HTTP strategy creates its own when `None`.
    pub http_client: Option<reqwest::Client>,
    /// Budget for each dialect tried during detection.
    pub detect_timeout: Duration,
    /// Pause after a dialect that answered without a `Header`.
    pub detect_delay: Duration,
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            dialect_id: None,
            transport: TransportConfig::default(),
            http_client: None,
            detect_timeout: Duration::from_secs(5),
            detect_delay: Duration::from_millis(500),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_dialect(mut self, id: impl Into<String>) -> Self {
        self.dialect_id = Some(id.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

/// Polling cadence and time budgets for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub update_interval: Duration,
    /// Upper bound on one whole status poll, retries included.
    pub poll_timeout: Duration,
    /// Wait between a successful action and the follow-up refresh.
    pub action_grace: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            poll_timeout: Duration::from_secs(30),
            action_grace: Duration::from_millis(200),
        }
    }
}

impl CoordinatorConfig {
    /// A config polling every `interval`, raised to the 1 s minimum.
    pub fn with_interval(interval: Duration) -> Self {
        let update_interval = if interval < MIN_UPDATE_INTERVAL {
            warn!(
                requested_ms = interval.as_millis(),
                "update interval below minimum, using 1s"
            );
            MIN_UPDATE_INTERVAL
        } else {
            interval
        };
        Self {
            update_interval,
            ..Self::default()
        }
    }
}
