// ── Core error types ──
//
// Domain-level failures surfaced to the CLI and any other consumer.
// Wire errors from `ventaly-api` are reclassified through the `From` impl;
// raw socket and HTTP errors never leak past this crate.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Device did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed device response: {message}")]
    Parse { message: String, body: String },

    #[error("Unable to detect the API version of {host}: no known dialect answered")]
    ApiVersionDetection { host: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    #[error("Unknown API dialect: {id}")]
    UnknownDialect { id: String },

    #[error("Device is not configured: {message}")]
    NotConfigured { message: String },

    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the device was unreachable, as opposed to reachable but
    /// misbehaving. Consumers keep showing last-known data in this case.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    pub(crate) fn update_failed(err: &CoreError) -> Self {
        Self::UpdateFailed {
            message: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ventaly_api::Error> for CoreError {
    fn from(err: ventaly_api::Error) -> Self {
        match err {
            ventaly_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            ref e if e.is_timeout() => CoreError::Timeout { timeout_ms: 0 },
            ventaly_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                host: e
                    .url()
                    .and_then(|u| u.host_str().map(String::from))
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            ventaly_api::Error::Socket {
                host, port, source, ..
            } => CoreError::ConnectionFailed {
                host: format!("{host}:{port}"),
                reason: source.to_string(),
            },
            ventaly_api::Error::Parse { message, body } => CoreError::Parse { message, body },
            ventaly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device address: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_refusal_becomes_connection_failed() {
        let api = ventaly_api::Error::Socket {
            host: "10.0.0.9".into(),
            port: 48000,
            stage: "connect to",
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        let err = CoreError::from(api);
        assert!(matches!(err, CoreError::ConnectionFailed { ref host, .. } if host == "10.0.0.9:48000"));
        assert!(err.is_unreachable());
    }

    #[test]
    fn socket_timeout_becomes_timeout() {
        let api = ventaly_api::Error::Socket {
            host: "10.0.0.9".into(),
            port: 48000,
            stage: "receive from",
            source: std::io::Error::from(std::io::ErrorKind::TimedOut),
        };
        assert!(matches!(CoreError::from(api), CoreError::Timeout { .. }));
    }

    #[test]
    fn parse_error_keeps_body() {
        let api = ventaly_api::Error::Parse {
            message: "no JSON object".into(),
            body: "garbage".into(),
        };
        let err = CoreError::from(api);
        assert!(matches!(err, CoreError::Parse { ref body, .. } if body == "garbage"));
        assert!(!err.is_unreachable());
    }
}
