use thiserror::Error;

/// HTTP statuses the bridge returns for conditions that resolve on their own.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Top-level error type for the `loxhue-api` crate.
///
/// Covers every failure mode of the bridge surfaces: transport, TLS,
/// HTTP status, response decoding, and the event stream.
/// `loxhue-core` maps these into the engine's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The application key cannot be used as a header value.
    #[error("Invalid application key: {0}")]
    InvalidAppKey(String),

    /// The application key was rejected by the bridge.
    #[error("Application key rejected by bridge (HTTP {status})")]
    Unauthorized { status: u16 },

    // ── HTTP ────────────────────────────────────────────────────────
    /// Rate limited by the bridge (HTTP 429).
    #[error("Rate limited by bridge")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Non-success status with the bridge's error descriptions.
    #[error("Bridge API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Event stream ────────────────────────────────────────────────
    /// The push-event stream could not be opened or broke mid-read.
    #[error("Event stream error: {0}")]
    EventStream(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Timeouts, resets, refused/unreachable connections and DNS failures
    /// are retryable, as are 408, 429 and the 5xx gateway family.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                if let Some(status) = e.status() {
                    return RETRYABLE_STATUS_CODES.contains(&status.as_u16());
                }
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Self::RateLimited { .. } | Self::EventStream(_) => true,
            Self::Http { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            _ => false,
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Unauthorized { status } | Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns `true` for HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Short description of the triggering condition, used in retry logs.
    pub fn retry_reason(&self) -> String {
        if let Some(status) = self.status() {
            return format!("HTTP {status}");
        }
        match self {
            Self::Transport(e) if e.is_timeout() => "timeout".into(),
            Self::Transport(e) if e.is_connect() => "connection failed".into(),
            Self::Transport(_) => "network error".into(),
            Self::EventStream(_) => "stream error".into(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_are_transient() {
        for status in RETRYABLE_STATUS_CODES {
            let err = Error::Http {
                status,
                message: String::new(),
            };
            assert!(err.is_transient(), "HTTP {status} should be retryable");
        }
    }

    #[test]
    fn client_errors_are_fatal() {
        for status in [400_u16, 403, 404, 405, 409, 422] {
            let err = Error::Http {
                status,
                message: String::new(),
            };
            assert!(!err.is_transient(), "HTTP {status} should not be retried");
        }
        assert!(!Error::Unauthorized { status: 403 }.is_transient());
    }

    #[test]
    fn rate_limit_is_transient_and_flagged() {
        let err = Error::RateLimited {
            retry_after_secs: Some(1),
        };
        assert!(err.is_transient());
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_reason(), "HTTP 429");
    }

    #[test]
    fn not_found_detection() {
        let err = Error::Http {
            status: 404,
            message: "not found".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}
