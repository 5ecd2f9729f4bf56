// ── Core error types ──
//
// Errors surfaced by the engine. Callers never see reqwest or serde errors
// directly; the `From<loxhue_api::Error>` impl sorts transport failures into
// transient (already retried) and fatal (not worth retrying).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Upstream errors ──────────────────────────────────────────────
    /// Network failure, 5xx or 429 that survived every retry attempt.
    #[error("Bridge temporarily unavailable: {message}")]
    TransientUpstream {
        message: String,
        status: Option<u16>,
    },

    /// 4xx other than 429, or any failure that is not worth retrying.
    #[error("Bridge rejected request: {message}")]
    FatalUpstream {
        message: String,
        status: Option<u16>,
    },

    /// The push-event stream dropped. Always recovered by reconnecting.
    #[error("Event stream disconnected: {reason}")]
    StreamDisconnect { reason: String },

    // ── Downstream errors ────────────────────────────────────────────
    #[error("UDP send to {target} failed: {reason}")]
    DownstreamSend { target: String, reason: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Bridge is not configured (missing host or application key)")]
    NotConfigured,

    #[error("Invalid device name {name:?}: expected 1-50 of [A-Za-z0-9_-]")]
    InvalidName { name: String },

    #[error("Unknown device: {name}")]
    UnknownDevice { name: String },

    #[error("Device {name} is read-only ({kind})")]
    ReadOnlyDevice { name: String, kind: String },

    #[error("Invalid value {value:?}: {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("Invalid scene id {id:?}: must be a UUID")]
    InvalidScene { id: String },

    #[error("Scene not found: {id}")]
    SceneNotFound { id: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientUpstream { .. } | Self::StreamDisconnect { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransientUpstream { status, .. } | Self::FatalUpstream { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<loxhue_api::Error> for CoreError {
    fn from(err: loxhue_api::Error) -> Self {
        match err {
            loxhue_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid bridge URL: {e}"),
            },
            loxhue_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            loxhue_api::Error::InvalidAppKey(msg) => CoreError::Config {
                message: format!("Invalid application key: {msg}"),
            },
            loxhue_api::Error::EventStream(reason) => CoreError::StreamDisconnect { reason },
            other => {
                let status = other.status();
                let message = other.to_string();
                if other.is_transient() {
                    CoreError::TransientUpstream { message, status }
                } else {
                    CoreError::FatalUpstream { message, status }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_maps_to_transient() {
        let err: CoreError = loxhue_api::Error::Http {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn client_error_maps_to_fatal() {
        let err: CoreError = loxhue_api::Error::Http {
            status: 404,
            message: "gone".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::FatalUpstream {
                status: Some(404),
                ..
            }
        ));
    }

    #[test]
    fn stream_failure_maps_to_disconnect() {
        let err: CoreError = loxhue_api::Error::EventStream("eof".into()).into();
        assert!(matches!(err, CoreError::StreamDisconnect { .. }));
    }
}
