//! Shared configuration for the pumpwatch CLI.
//!
//! TOML profiles, bearer token resolution (env + keyring + plaintext),
//! and translation to `pumpwatch_core::MonitorConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pumpwatch_core::{MonitorConfig, NozzleCode, StationLayout, TlsVerification};

/// Keyring service name under which profile tokens are stored.
pub const KEYRING_SERVICE: &str = "pumpwatch";

const MAX_NOZZLES: usize = 99;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("keyring unavailable: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named station profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_push() -> bool {
    true
}

/// A named station profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://192.168.0.10:5000").
    pub backend: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Open the push hub in live mode.
    #[serde(default = "default_push")]
    pub push: bool,

    /// Hub path relative to the backend URL.
    pub hub_path: Option<String>,

    pub status_interval_ms: Option<u64>,
    pub visualization_interval_ms: Option<u64>,
    pub attendant_cache_secs: Option<u64>,
    pub price_cache_secs: Option<u64>,

    /// Hide readings older than this many seconds.
    pub reading_ttl_secs: Option<u64>,

    /// Multiplier applied to every raw cash value.
    pub cash_scale: Option<f64>,

    pub dispensers: Option<u8>,
    pub nozzles_per_dispenser: Option<u8>,

    /// Product overrides keyed by nozzle code ("07" = "Diesel").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub products: BTreeMap<String, String>,
}

impl Profile {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            push: true,
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pumpwatch", "pumpwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pumpwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest on a double underscore, e.g.
/// `PUMPWATCH_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PUMPWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the profile's bearer token, if any.
///
/// Order: the profile's `token_env` variable, the system keyring, then
/// the plaintext value. A backend without auth needs none of them.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Store a profile's bearer token in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(token)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation to MonitorConfig ────────────────────────────────────

/// Build the forecourt layout a profile describes.
pub fn profile_layout(profile: &Profile) -> Result<StationLayout, ConfigError> {
    let dispensers = profile.dispensers.unwrap_or(10);
    let per = profile.nozzles_per_dispenser.unwrap_or(3);
    let count = usize::from(dispensers) * usize::from(per);
    if count == 0 || count > MAX_NOZZLES {
        return Err(ConfigError::Validation {
            field: "dispensers".into(),
            reason: format!(
                "{dispensers} dispensers x {per} nozzles gives {count} nozzles, expected 1..={MAX_NOZZLES}"
            ),
        });
    }

    let base = if (dispensers, per) == (10, 3) {
        StationLayout::standard()
    } else {
        StationLayout::new(dispensers, per)
    };

    let mut overrides = Vec::with_capacity(profile.products.len());
    for (key, product) in &profile.products {
        let code: NozzleCode = key.parse().map_err(|_| ConfigError::Validation {
            field: format!("products.{key}"),
            reason: "expected a nozzle code between 01 and 99".into(),
        })?;
        if !base.contains(code) {
            return Err(ConfigError::Validation {
                field: format!("products.{key}"),
                reason: format!("nozzle {code} is outside the {count}-nozzle layout"),
            });
        }
        overrides.push((code, product.clone()));
    }

    Ok(base.with_products(overrides))
}

/// Translate a profile into a `MonitorConfig` with an already-resolved token.
pub fn build_monitor_config(
    profile: &Profile,
    token: Option<SecretString>,
) -> Result<MonitorConfig, ConfigError> {
    let url: url::Url = profile
        .backend
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "backend".into(),
            reason: format!("invalid URL: {}", profile.backend),
        })?;

    let mut config = MonitorConfig::new(url);
    config.token = token;
    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.push_enabled = profile.push;
    config.layout = Arc::new(profile_layout(profile)?);

    if let Some(secs) = profile.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ref path) = profile.hub_path {
        config.hub_path.clone_from(path);
    }
    if let Some(ms) = profile.status_interval_ms {
        config.status_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.visualization_interval_ms {
        config.visualization_interval = Duration::from_millis(ms);
    }
    if let Some(secs) = profile.attendant_cache_secs {
        config.attendant_cache_window = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.price_cache_secs {
        config.price_cache_window = Duration::from_secs(secs);
    }
    config.reading_ttl = profile.reading_ttl_secs.map(Duration::from_secs);
    if let Some(scale) = profile.cash_scale {
        config.cash_scale = scale;
    }

    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

/// Build a `MonitorConfig` from a profile, resolving its token.
pub fn profile_to_monitor_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<MonitorConfig, ConfigError> {
    build_monitor_config(profile, resolve_token(profile, profile_name))
}
