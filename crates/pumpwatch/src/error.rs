//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pumpwatch_config::ConfigError;
use pumpwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the station backend at {url}")]
    #[diagnostic(
        code(pumpwatch::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Try: pumpwatch dispensers --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Station backend timed out")]
    #[diagnostic(
        code(pumpwatch::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(pumpwatch::auth_failed),
        help(
            "Verify the bearer token for this station.\n\
             Run: pumpwatch config set-token"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Dispenser {number} not found")]
    #[diagnostic(
        code(pumpwatch::not_found),
        help("This station has dispensers 1 to {available}.")
    )]
    DispenserNotFound { number: u8, available: u8 },

    #[error("No active attendant holds tag {tag}")]
    #[diagnostic(
        code(pumpwatch::attendant_not_found),
        help("Check the tag against the attendant directory, or enroll it first.")
    )]
    AttendantNotFound { tag: String },

    #[error("Nozzle {code} cannot take a preset while its dispenser is {status}")]
    #[diagnostic(
        code(pumpwatch::nozzle_unavailable),
        help("Only available or blocked dispensers accept presets. Wait for the hang-up and retry.")
    )]
    NozzleUnavailable { code: String, status: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(pumpwatch::api_error))]
    ApiError { status: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pumpwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pumpwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pumpwatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No station configured")]
    #[diagnostic(
        code(pumpwatch::no_config),
        help(
            "Create a profile with: pumpwatch config init\n\
             Or pass --backend / set PUMPWATCH_BACKEND.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pumpwatch::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(pumpwatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(pumpwatch::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::DispenserNotFound { .. }
            | Self::AttendantNotFound { .. }
            | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::PushUnavailable { reason } => CliError::ConnectionFailed {
                url: "(push hub)".into(),
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::Api { message, status } => CliError::ApiError {
                status: status.map_or_else(|| "-".into(), |s| s.to_string()),
                message,
            },

            CoreError::InvalidRequest { message } => CliError::Validation {
                field: "request".into(),
                reason: message,
            },

            CoreError::UnknownAttendant { tag } => CliError::AttendantNotFound { tag },

            CoreError::NozzleUnavailable { code, status } => {
                CliError::NozzleUnavailable { code, status }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                status: "internal".into(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let cases = [
            (CoreError::Timeout, exit_code::TIMEOUT),
            (
                CoreError::AuthenticationFailed {
                    message: "token expired".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::ConnectionFailed {
                    url: "http://station.local/".into(),
                    reason: "connection refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Api {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
            (
                CoreError::Config {
                    message: "cash scale must be a positive number".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::InvalidRequest {
                    message: "preset timeout must be at most 99s".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::UnknownAttendant {
                    tag: "0A1B2C3D4E5F6789".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::NozzleUnavailable {
                    code: "04".into(),
                    status: "Fueling".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "backend".into(),
            reason: "invalid URL".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
