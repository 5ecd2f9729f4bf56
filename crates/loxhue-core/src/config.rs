// ── Runtime bridge configuration ──
//
// These types describe how to reach the bridge and the controller, plus the
// pacing knobs of the engine. They never touch disk: the CLI builds a
// `BridgeConfig` (usually through loxhue-config) and hands it in.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use loxhue_api::{RetryPolicy, TlsMode, TransportConfig};
use secrecy::{ExposeSecret, SecretString};

/// TLS verification strategy for the bridge connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Trust exactly the certificate with this SHA-256 fingerprint.
    PinnedFingerprint(String),
    /// Skip verification. Default, since bridges ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

impl TlsVerification {
    fn to_tls_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::PinnedFingerprint(fp) => TlsMode::PinnedFingerprint(fp.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Minimum spacing between outbound writes, per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Individually addressed lights (~8 req/s).
    pub light: Duration,
    /// Rooms and zones; the bridge enforces a much lower ceiling here.
    pub grouped_light: Duration,
    /// Pause between targets of an all-lights sequence.
    pub sequence_pacing: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            light: Duration::from_millis(120),
            grouped_light: Duration::from_millis(1100),
            sequence_pacing: Duration::from_millis(100),
        }
    }
}

/// Event-stream reconnect backoff: `min(initial * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Everything the engine needs to run against one bridge and one controller.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge host: IP, hostname, or full URL.
    pub host: String,
    /// The `hue-application-key` obtained at pairing time.
    pub app_key: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout for resource calls.
    pub timeout: Duration,
    /// Controller UDP endpoint. `None` disables downstream sends.
    pub controller: Option<SocketAddr>,
    /// First segment of every datagram (`hue.<name>.<attr> <value>`).
    pub namespace: String,
    /// Default light transition in milliseconds.
    pub transition_ms: u32,
    pub retry: RetryPolicy,
    pub rate_limits: RateLimits,
    pub reconnect: ReconnectPolicy,
    /// The stream is unhealthy once no event arrived for this long.
    pub stale_after: Duration,
    /// Periodic catalog rebuild (seconds). 0 = only on (re)connect and listing.
    pub catalog_refresh_secs: u64,
    /// Verbose per-event logging.
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            app_key: SecretString::from(String::new()),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            controller: None,
            namespace: "hue".into(),
            transition_ms: 400,
            retry: RetryPolicy::default(),
            rate_limits: RateLimits::default(),
            reconnect: ReconnectPolicy::default(),
            stale_after: Duration::from_secs(300),
            catalog_refresh_secs: 0,
            debug: false,
        }
    }
}

impl BridgeConfig {
    /// A bridge needs both a host and an application key.
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.app_key.expose_secret().is_empty()
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
        }
    }
}
