use thiserror::Error;

/// Top-level error type for the `ventaly-api` crate.
///
/// Every network boundary in this crate reclassifies its failures into one
/// of these variants; nothing escapes a socket or HTTP call unclassified.
/// `ventaly-core` maps these into domain-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Raw socket failure on the TCP dialect.
    #[error("Socket error while trying to {stage} {host}:{port}: {source}")]
    Socket {
        host: String,
        port: u16,
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A single exchange exceeded its time budget.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// URL construction failed (bad host or path).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// The response carried no recoverable JSON object, with the raw body
    /// kept for debugging.
    #[error("Malformed response: {message}")]
    Parse { message: String, body: String },
}

impl Error {
    /// Returns `true` if this failure is a timeout, the only kind the
    /// retry wrapper re-attempts.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Socket { source, .. } => source.kind() == std::io::ErrorKind::TimedOut,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for connection-level failures (including timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Socket { .. } | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the device answered but the body was unusable.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    pub(crate) fn socket(
        host: &str,
        port: u16,
        stage: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::Socket {
            host: host.to_owned(),
            port,
            stage,
            source,
        }
    }

    pub(crate) fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_timeouts_count_as_timeouts() {
        let err = Error::socket(
            "10.0.0.2",
            48000,
            "receive from",
            std::io::Error::from(std::io::ErrorKind::TimedOut),
        );
        assert!(err.is_timeout());
        assert!(err.is_transport());
    }

    #[test]
    fn refused_connection_is_not_a_timeout() {
        let err = Error::socket(
            "10.0.0.2",
            48000,
            "connect to",
            std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        );
        assert!(!err.is_timeout());
        assert!(err.is_transport());
        assert!(!err.is_parse());
    }

    #[test]
    fn parse_errors_are_not_transport_errors() {
        let err = Error::Parse {
            message: "no JSON object found".into(),
            body: "garbage".into(),
        };
        assert!(err.is_parse());
        assert!(!err.is_transport());
        assert!(!err.is_timeout());
    }
}
