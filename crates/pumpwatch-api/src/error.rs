use thiserror::Error;

/// Top-level error type for the `pumpwatch-api` crate.
///
/// Covers every failure mode of the two backend surfaces: the REST
/// monitoring endpoints and the push hub. `pumpwatch-core` maps these
/// into engine-level errors; none of them ever reach the view layer.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Backend rejected the bearer token (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST API ────────────────────────────────────────────────────
    /// Non-success HTTP status from a monitoring endpoint.
    #[error("Backend API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Push hub ────────────────────────────────────────────────────
    /// Hub connection or handshake failed.
    #[error("Hub connection failed: {0}")]
    HubConnect(String),

    /// Hub sent a close message carrying an error.
    #[error("Hub closed: {reason}")]
    HubClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::HubConnect(_) | Self::HubClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the backend refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}
