//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ventaly_config::ConfigError;
use ventaly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach device at {host}: {reason}")]
    #[diagnostic(
        code(ventaly::connection_failed),
        help(
            "Check that the device is powered on and on the same network.\n\
             Raw TCP devices (API v0) listen on port 48000, HTTP devices on port 80."
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Device did not answer in time")]
    #[diagnostic(
        code(ventaly::timeout),
        help("Increase the per-attempt timeout with --timeout or check the device's Wi-Fi signal.")
    )]
    Timeout,

    #[error("Could not detect the API version of {host}")]
    #[diagnostic(
        code(ventaly::detection_failed),
        help(
            "No known dialect answered with a device header.\n\
             Try restricting detection: ventaly detect --host {host} --api-version 0"
        )
    )]
    DetectionFailed { host: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("The device sent a response that could not be read: {message}")]
    #[diagnostic(code(ventaly::bad_response), help("Re-run with -vv to log the raw response."))]
    BadResponse { message: String },

    #[error("Operation '{operation}' is not supported: {reason}")]
    #[diagnostic(code(ventaly::unsupported))]
    Unsupported { operation: String, reason: String },

    #[error("Update failed: {message}")]
    #[diagnostic(code(ventaly::update_failed))]
    UpdateFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ventaly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ventaly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ventaly config set-host <HOST> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(ventaly::no_config),
        help(
            "Pass --host, or save a profile with: ventaly config set-host <HOST>\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ventaly::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(ventaly::json), help("Pass a single JSON object, quoted for your shell."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::DetectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => {
                CliError::ConnectionFailed { host, reason }
            }
            CoreError::Timeout { .. } => CliError::Timeout,
            CoreError::Parse { message, .. } => CliError::BadResponse { message },
            CoreError::ApiVersionDetection { host } => CliError::DetectionFailed { host },
            CoreError::Unsupported { operation, reason } => {
                CliError::Unsupported { operation, reason }
            }
            CoreError::UnknownDialect { id } => CliError::Validation {
                field: "api_definition".into(),
                reason: format!("unknown dialect '{id}'; re-run detection"),
            },
            CoreError::NotConfigured { message } | CoreError::Config { message } => {
                CliError::Validation {
                    field: "device".into(),
                    reason: message,
                }
            }
            CoreError::UpdateFailed { message } => CliError::UpdateFailed { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
