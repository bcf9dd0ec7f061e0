// ── Core error types ──
//
// Errors surfaced by the monitor and its collaborators. The engine
// itself (grouping, enrichment, assembly) is total and never returns
// these. The `From<pumpwatch_api::Error>` impl translates transport
// failures into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach station backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Station backend timed out")]
    Timeout,

    #[error("Push hub unavailable: {reason}")]
    PushUnavailable { reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Operator requests ────────────────────────────────────────────
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("No active attendant holds tag {tag}")]
    UnknownAttendant { tag: String },

    #[error("Nozzle {code} cannot take a preset while its dispenser is {status}")]
    NozzleUnavailable { code: String, status: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a later poll could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout | Self::PushUnavailable { .. }
        ) || matches!(self, Self::Api { status: Some(s), .. } if *s >= 500)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pumpwatch_api::Error> for CoreError {
    fn from(err: pumpwatch_api::Error) -> Self {
        match err {
            pumpwatch_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            pumpwatch_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            pumpwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            pumpwatch_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            pumpwatch_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            pumpwatch_api::Error::HubConnect(reason) => CoreError::PushUnavailable { reason },
            pumpwatch_api::Error::HubClosed { reason } => CoreError::PushUnavailable {
                reason: format!("hub closed: {reason}"),
            },
            pumpwatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_is_preserved() {
        let err = CoreError::from(pumpwatch_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(matches!(err, CoreError::Api { status: Some(502), .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn auth_failure_maps_to_authentication() {
        let err = CoreError::from(pumpwatch_api::Error::Authentication {
            message: "backend returned 401".into(),
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn hub_errors_become_push_unavailable() {
        let err = CoreError::from(pumpwatch_api::Error::HubConnect("refused".into()));
        assert!(matches!(err, CoreError::PushUnavailable { .. }));
    }
}
