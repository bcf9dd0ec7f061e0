// ── Runtime monitor configuration ──
//
// Describes *how* to reach the station backend and how fast to poll.
// Never touches disk: the config crate builds a `MonitorConfig` and
// hands it in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pumpwatch_api::{HubHandle, StationClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::layout::StationLayout;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed forecourt backends).
    DangerAcceptInvalid,
}

/// Configuration for monitoring a single station.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend base URL (e.g. `http://192.168.0.10:5000`).
    pub backend_url: Url,
    /// Optional bearer token for REST calls and the push hub.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Authoritative status snapshot cadence.
    pub status_interval: Duration,
    /// Running-total poll cadence.
    pub visualization_interval: Duration,
    /// How often the catalog task checks for stale caches.
    pub catalog_check_interval: Duration,
    pub attendant_cache_window: Duration,
    pub price_cache_window: Duration,
    /// Open the push hub in addition to polling.
    pub push_enabled: bool,
    /// Hub path relative to the backend URL.
    pub hub_path: String,
    /// Hide readings not refreshed within this window. `None` keeps them forever.
    pub reading_ttl: Option<Duration>,
    /// Multiplier applied to every raw cash value.
    pub cash_scale: f64,
    pub layout: Arc<StationLayout>,
}

impl MonitorConfig {
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            status_interval: Duration::from_secs(3),
            visualization_interval: Duration::from_secs(1),
            catalog_check_interval: Duration::from_secs(5),
            attendant_cache_window: Duration::from_secs(30),
            price_cache_window: Duration::from_secs(60),
            push_enabled: true,
            hub_path: "hubs/monitoring".into(),
            reading_ttl: None,
            cash_scale: 1.0,
            layout: Arc::new(StationLayout::standard()),
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.cash_scale.is_finite() && self.cash_scale > 0.0) {
            return Err(CoreError::Config {
                message: format!("cash scale must be a positive number, got {}", self.cash_scale),
            });
        }
        for (name, value) in [
            ("status interval", self.status_interval),
            ("visualization interval", self.visualization_interval),
            ("catalog check interval", self.catalog_check_interval),
        ] {
            if value.is_zero() {
                return Err(CoreError::Config {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        let nozzles = self.layout.nozzle_count();
        if nozzles == 0 || nozzles > 99 {
            return Err(CoreError::Config {
                message: format!("layout must have between 1 and 99 nozzles, got {nozzles}"),
            });
        }
        Ok(())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            bearer_token: self.token.clone(),
        }
    }

    pub fn build_client(&self) -> Result<StationClient, CoreError> {
        Ok(StationClient::new(self.backend_url.as_str(), &self.transport())?)
    }

    /// WebSocket URL of the push hub.
    pub fn hub_url(&self) -> Result<Url, CoreError> {
        Ok(HubHandle::hub_url(&self.backend_url, &self.hub_path)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::new("http://10.0.0.5:5000".parse().unwrap())
    }

    #[test]
    fn defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.status_interval, Duration::from_secs(3));
        assert_eq!(config.visualization_interval, Duration::from_secs(1));
        assert_eq!(config.layout.nozzle_count(), 30);
    }

    #[test]
    fn rejects_bad_cash_scale() {
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = config();
            config.cash_scale = scale;
            assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
        }
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = config();
        config.status_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("status interval"));
    }

    #[test]
    fn rejects_oversized_layout() {
        let mut config = config();
        config.layout = Arc::new(StationLayout::new(34, 3));
        assert!(config.validate().is_err());
    }

    #[test]
    fn hub_url_follows_backend_scheme() {
        let mut config = config();
        assert_eq!(config.hub_url().unwrap().as_str(), "ws://10.0.0.5:5000/hubs/monitoring");
        config.backend_url = "https://station.local/".parse().unwrap();
        assert_eq!(config.hub_url().unwrap().as_str(), "wss://station.local/hubs/monitoring");
    }

    #[test]
    fn transport_maps_tls_mode() {
        let mut config = config();
        config.tls = TlsVerification::DangerAcceptInvalid;
        assert!(matches!(config.transport().tls, TlsMode::DangerAcceptInvalid));
        assert!(config.transport().bearer_token.is_none());
    }
}
