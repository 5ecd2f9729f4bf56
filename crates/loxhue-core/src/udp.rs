// ── Downstream UDP sink ──
//
// Fire-and-forget text datagrams to the controller:
// `<namespace>.<name>.<attribute> <value>`. No acknowledgement, no retry.
// Failures are counted and logged; they never propagate past the sink.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strum::Display;
use tracing::{debug, error, warn};

use crate::error::CoreError;
use crate::model::{Attribute, StatusValue, TargetKind};

/// Log category carried as a `category` field on sink and reconciler logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Category {
    Light,
    Sensor,
    Button,
    Scene,
    System,
}

impl From<TargetKind> for Category {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Light | TargetKind::Group => Self::Light,
            TargetKind::Sensor => Self::Sensor,
            TargetKind::Button => Self::Button,
        }
    }
}

/// Render one datagram.
pub fn render(namespace: &str, name: &str, attribute: Attribute, value: &StatusValue) -> String {
    format!("{namespace}.{name}.{attribute} {value}")
}

// ── Stats ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SinkStats {
    pub success_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub error_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    success: AtomicU64,
    errors: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl Counters {
    fn record_success(&self) {
        let success = self.success.fetch_add(1, Ordering::Relaxed) + 1;
        // Old failures fade out as the link stays healthy.
        if success % 100 == 0 {
            let _ = self
                .errors
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |e| {
                    Some(e.saturating_sub(10))
                });
        }
    }

    fn record_error(&self, reason: &str) -> (u64, u64) {
        let errors = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.to_owned());
        (errors, self.success.load(Ordering::Relaxed) + errors)
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn snapshot(&self) -> SinkStats {
        let success_count = self.success.load(Ordering::Relaxed);
        let error_count = self.errors.load(Ordering::Relaxed);
        let total = success_count + error_count;
        SinkStats {
            success_count,
            error_count,
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            error_rate: if total == 0 {
                0.0
            } else {
                error_count as f64 / total as f64
            },
        }
    }
}

// ── Sink trait ───────────────────────────────────────────────────────

/// Where reconciled status goes. Sends are synchronous and never block.
pub trait DownstreamSink: Send + Sync {
    fn send(
        &self,
        name: &str,
        attribute: Attribute,
        value: &StatusValue,
        category: Category,
    ) -> Result<(), CoreError>;

    fn stats(&self) -> SinkStats;
}

// ── UdpSink ──────────────────────────────────────────────────────────

pub struct UdpSink {
    // Non-blocking std socket: every send is a real `sendto`, independent of
    // reactor readiness.
    socket: Option<UdpSocket>,
    target: Option<SocketAddr>,
    namespace: String,
    debug: bool,
    counters: Counters,
}

impl UdpSink {
    /// Bind an ephemeral local socket for `target`. With no target every
    /// send is skipped.
    pub async fn bind(
        target: Option<SocketAddr>,
        namespace: impl Into<String>,
        debug: bool,
    ) -> Result<Self, CoreError> {
        let socket = match target {
            Some(addr) => {
                let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let bind_failed = |e: std::io::Error| CoreError::DownstreamSend {
                    target: addr.to_string(),
                    reason: format!("bind failed: {e}"),
                };
                let socket = tokio::net::UdpSocket::bind(local)
                    .await
                    .map_err(bind_failed)?;
                Some(socket.into_std().map_err(bind_failed)?)
            }
            None => None,
        };
        Ok(Self {
            socket,
            target,
            namespace: namespace.into(),
            debug,
            counters: Counters::default(),
        })
    }

    pub fn target(&self) -> Option<SocketAddr> {
        self.target
    }

    fn warn_on_high_error_rate(errors: u64, total: u64) {
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let rate = errors as f64 / total as f64;
        if rate > 0.1 && total > 10 {
            warn!(
                category = %Category::System,
                error_rate = %format!("{:.1}%", rate * 100.0),
                errors,
                total,
                "high UDP error rate"
            );
        }
    }
}

impl DownstreamSink for UdpSink {
    fn send(
        &self,
        name: &str,
        attribute: Attribute,
        value: &StatusValue,
        category: Category,
    ) -> Result<(), CoreError> {
        let (Some(socket), Some(target)) = (&self.socket, self.target) else {
            debug!(%category, name, %attribute, "controller address not configured, skipping UDP send");
            return Ok(());
        };

        let message = render(&self.namespace, name, attribute, value);
        match socket.send_to(message.as_bytes(), target) {
            Ok(_) => {
                self.counters.record_success();
                if self.debug || self.counters.errors.load(Ordering::Relaxed) > 0 {
                    debug!(%category, %message, "UDP sent");
                }
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                error!(%category, %target, error = %reason, "UDP send failed");
                let (errors, total) = self.counters.record_error(&reason);
                Self::warn_on_high_error_rate(errors, total);
                Err(CoreError::DownstreamSend {
                    target: target.to_string(),
                    reason,
                })
            }
        }
    }

    fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }
}
