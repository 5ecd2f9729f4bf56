//! Configuration for loxhue.
//!
//! One TOML file (bridge, controller, tuning, and the `[[mapping]]` table),
//! layered with `LOXHUE_` environment variables, API-key resolution
//! (env + keyring + plaintext), and translation to
//! `loxhue_core::BridgeConfig`.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use loxhue_core::{
    BridgeConfig, Mapping, MappingEntry, RateLimits, ReconnectPolicy, RetryPolicy, TargetKind,
    TlsVerification,
};
use loxhue_core::model::is_valid_name;

/// Keyring service name; the account is `app-key`.
const KEYRING_SERVICE: &str = "loxhue";
const KEYRING_ACCOUNT: &str = "app-key";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("bridge is not configured: {missing}")]
    NotConfigured { missing: String },

    #[error("no application key found (checked {checked})")]
    NoCredentials { checked: String },

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

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub tuning: Tuning,

    /// Verbose per-event logging.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub mapping: Vec<MappingConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BridgeSection {
    /// Bridge IP, hostname, or URL.
    pub host: Option<String>,

    /// Application key (plaintext; prefer keyring or env var).
    pub app_key: Option<String>,

    /// Environment variable holding the application key.
    pub app_key_env: Option<String>,

    /// Path to a CA certificate that signed the bridge certificate.
    pub ca_cert: Option<PathBuf>,

    /// SHA-256 fingerprint of the bridge certificate to pin.
    pub fingerprint: Option<String>,

    /// Verify against the system trust store. Off by default: bridges
    /// ship self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ControllerSection {
    /// Controller host for UDP status. Unset disables status echo.
    pub host: Option<String>,

    #[serde(default = "default_udp_port")]
    pub port: u16,

    /// First segment of every datagram.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            host: None,
            port: default_udp_port(),
            namespace: default_namespace(),
        }
    }
}

fn default_udp_port() -> u16 {
    7000
}
fn default_namespace() -> String {
    "hue".into()
}

/// Timing knobs. All durations in milliseconds unless named otherwise.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub transition_ms: u32,
    pub retry_attempts: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
    pub light_delay_ms: u64,
    pub group_delay_ms: u64,
    pub sequence_delay_ms: u64,
    pub reconnect_max_secs: u64,
    pub stale_after_secs: u64,
    pub catalog_refresh_secs: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        let core = BridgeConfig::default();
        let ms = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self {
            transition_ms: core.transition_ms,
            retry_attempts: core.retry.max_attempts,
            retry_initial_ms: ms(core.retry.initial_backoff),
            retry_max_ms: ms(core.retry.max_backoff),
            light_delay_ms: ms(core.rate_limits.light),
            group_delay_ms: ms(core.rate_limits.grouped_light),
            sequence_delay_ms: ms(core.rate_limits.sequence_pacing),
            reconnect_max_secs: core.reconnect.max.as_secs(),
            stale_after_secs: core.stale_after.as_secs(),
            catalog_refresh_secs: core.catalog_refresh_secs,
        }
    }
}

/// One `[[mapping]]` table as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappingConfig {
    pub name: String,
    pub uuid: String,
    /// `light`, `group`, `sensor`, or `button`.
    pub kind: String,
    #[serde(default)]
    pub sync_status: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "loxhue", "loxhue").map_or_else(
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
    p.push("loxhue");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults ← file ← `LOXHUE_*` env. Nested keys use `__`, e.g.
/// `LOXHUE_BRIDGE__HOST`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("LOXHUE_").split("__"));

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Credential resolution ───────────────────────────────────────────

/// `app_key_env` → system keyring → plaintext `app_key`.
pub fn resolve_app_key(bridge: &BridgeSection) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = bridge.app_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref key) = bridge.app_key {
        if !key.is_empty() {
            return Ok(SecretString::from(key.clone()));
        }
    }

    Err(ConfigError::NoCredentials {
        checked: "app_key_env, keyring, app_key".into(),
    })
}

// ── Mapping ─────────────────────────────────────────────────────────

/// Keep the valid entries; describe each dropped one.
pub fn validate_mapping(entries: &[MappingConfig]) -> (Mapping, Vec<String>) {
    let mut kept = Vec::with_capacity(entries.len());
    let mut warnings = Vec::new();

    for (index, raw) in entries.iter().enumerate() {
        let name = raw.name.trim().to_lowercase();
        if !is_valid_name(&name) {
            warnings.push(format!("mapping #{index}: invalid name {:?}", raw.name));
            continue;
        }
        if raw.uuid.trim().is_empty() {
            warnings.push(format!("mapping #{index} ({name}): missing uuid"));
            continue;
        }
        let Ok(kind) = raw.kind.parse::<TargetKind>() else {
            warnings.push(format!("mapping #{index} ({name}): unknown kind {:?}", raw.kind));
            continue;
        };
        if kept.iter().any(|e: &MappingEntry| e.name == name) {
            warnings.push(format!("mapping #{index} ({name}): duplicate name, keeping the first"));
            continue;
        }
        kept.push(MappingEntry::new(name, raw.uuid.trim(), kind).with_sync_status(raw.sync_status));
    }

    (Mapping::new(kept), warnings)
}

impl From<&MappingEntry> for MappingConfig {
    fn from(entry: &MappingEntry) -> Self {
        Self {
            name: entry.name.clone(),
            uuid: entry.uuid.clone(),
            kind: entry.kind.to_string(),
            sync_status: entry.sync_status,
        }
    }
}

// ── Translation to core ─────────────────────────────────────────────

fn resolve_controller(section: &ControllerSection) -> Result<Option<SocketAddr>, ConfigError> {
    let Some(host) = section.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    if section.port == 0 {
        return Err(ConfigError::Validation {
            field: "controller.port".into(),
            reason: "must be 1-65535".into(),
        });
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Some(SocketAddr::new(ip, section.port)));
    }
    (host, section.port)
        .to_socket_addrs()
        .map_err(|e| ConfigError::Validation {
            field: "controller.host".into(),
            reason: format!("cannot resolve {host}: {e}"),
        })?
        .next()
        .map(Some)
        .ok_or_else(|| ConfigError::Validation {
            field: "controller.host".into(),
            reason: format!("{host} has no addresses"),
        })
}

fn resolve_tls(bridge: &BridgeSection) -> TlsVerification {
    if let Some(ref fp) = bridge.fingerprint {
        TlsVerification::PinnedFingerprint(fp.clone())
    } else if let Some(ref ca_path) = bridge.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if bridge.verify_tls {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    }
}

/// Build the runtime configuration. Fails when host or key is missing.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let host = cfg
        .bridge
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConfigError::NotConfigured {
            missing: "bridge.host".into(),
        })?;
    let app_key = resolve_app_key(&cfg.bridge)?;
    let defaults = BridgeConfig::default();
    let t = &cfg.tuning;

    if t.retry_attempts == 0 {
        return Err(ConfigError::Validation {
            field: "tuning.retry_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(BridgeConfig {
        host: host.to_owned(),
        app_key,
        tls: resolve_tls(&cfg.bridge),
        timeout: cfg
            .bridge
            .timeout
            .map_or(defaults.timeout, Duration::from_secs),
        controller: resolve_controller(&cfg.controller)?,
        namespace: cfg.controller.namespace.clone(),
        transition_ms: t.transition_ms,
        retry: RetryPolicy {
            max_attempts: t.retry_attempts,
            initial_backoff: Duration::from_millis(t.retry_initial_ms),
            max_backoff: Duration::from_millis(t.retry_max_ms),
            ..defaults.retry
        },
        rate_limits: RateLimits {
            light: Duration::from_millis(t.light_delay_ms),
            grouped_light: Duration::from_millis(t.group_delay_ms),
            sequence_pacing: Duration::from_millis(t.sequence_delay_ms),
        },
        reconnect: ReconnectPolicy {
            max: Duration::from_secs(t.reconnect_max_secs),
            ..defaults.reconnect
        },
        stale_after: Duration::from_secs(t.stale_after_secs),
        catalog_refresh_secs: t.catalog_refresh_secs,
        debug: cfg.debug,
    })
}
