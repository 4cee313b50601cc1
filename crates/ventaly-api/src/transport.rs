// Shared transport configuration for both strategy flavours.
//
// HTTP strategies turn this into a reqwest::Client; the raw TCP strategy
// reads the same timeout and retry settings directly.

use std::time::Duration;

use crate::dialect::HostEndpoint;
use crate::retry::RetryPolicy;

/// Default cap on how much the raw TCP dialect reads from one response.
pub const DEFAULT_TCP_BUFFER_LIMIT: usize = 64 * 1024;

/// Shared transport configuration for building strategies.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout configured on the HTTP client.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Maximum number of bytes read from a raw TCP response.
    pub tcp_buffer_limit: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            timeout: retry.attempt_timeout,
            retry,
            tcp_buffer_limit: DEFAULT_TCP_BUFFER_LIMIT,
        }
    }
}

impl TransportConfig {
    /// A config whose client timeout and retry budget both use `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            retry: RetryPolicy {
                attempt_timeout: timeout,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }

    /// Settings used during dialect detection: one short attempt.
    pub fn detection(timeout: Duration) -> Self {
        Self {
            timeout,
            retry: RetryPolicy::single(timeout),
            tcp_buffer_limit: DEFAULT_TCP_BUFFER_LIMIT,
        }
    }

    /// This config with the endpoint's timeout as the per-attempt budget.
    pub fn for_endpoint(&self, endpoint: &HostEndpoint) -> Self {
        Self {
            timeout: endpoint.timeout,
            retry: RetryPolicy {
                attempt_timeout: endpoint.timeout,
                ..self.retry
            },
            tcp_buffer_limit: self.tcp_buffer_limit,
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("ventaly/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
