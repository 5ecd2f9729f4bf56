//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use loxhue_config::ConfigError;
use loxhue_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFIG: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the bridge: {message}")]
    #[diagnostic(
        code(loxhue::connection_failed),
        help("Check that the bridge is powered and reachable at bridge.host.")
    )]
    ConnectionFailed { message: String },

    #[error("Bridge rejected the application key")]
    #[diagnostic(
        code(loxhue::auth_failed),
        help("Pair a new application key and store it with app_key, app_key_env, or the keyring.")
    )]
    AuthFailed,

    #[error("Bridge error ({status}): {message}")]
    #[diagnostic(code(loxhue::bridge_error))]
    BridgeError { status: String, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(loxhue::not_found),
        help("Run: loxhue {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(loxhue::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Bridge is not configured")]
    #[diagnostic(
        code(loxhue::no_config),
        help(
            "Set bridge.host and an application key in the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No application key found")]
    #[diagnostic(
        code(loxhue::no_credentials),
        help("Set bridge.app_key, point bridge.app_key_env at a variable, or store it in the keyring.")
    )]
    NoCredentials,

    #[error(transparent)]
    #[diagnostic(code(loxhue::config))]
    Config(ConfigError),

    #[error("Internal error: {0}")]
    #[diagnostic(code(loxhue::internal))]
    Internal(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoConfig { .. } | Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotConfigured { .. } => CliError::NoConfig {
                path: loxhue_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { .. } => CliError::NoCredentials,
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TransientUpstream { message, .. }
            | CoreError::StreamDisconnect { reason: message } => {
                CliError::ConnectionFailed { message }
            }

            CoreError::FatalUpstream {
                status: Some(401 | 403),
                ..
            } => CliError::AuthFailed,

            CoreError::FatalUpstream { message, status } => CliError::BridgeError {
                status: status.map_or_else(|| "-".into(), |s| s.to_string()),
                message,
            },

            CoreError::DownstreamSend { target, reason } => CliError::ConnectionFailed {
                message: format!("controller {target}: {reason}"),
            },

            CoreError::NotConfigured => CliError::NoConfig {
                path: loxhue_config::config_path().display().to_string(),
            },

            CoreError::UnknownDevice { name } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: name,
                list_command: "targets".into(),
            },

            CoreError::SceneNotFound { id } => CliError::NotFound {
                resource_type: "scene".into(),
                identifier: id,
                list_command: "scenes".into(),
            },

            CoreError::InvalidName { name } => CliError::Validation {
                field: "name".into(),
                reason: format!("{name:?} must be 1-50 of [A-Za-z0-9_-]"),
            },

            CoreError::ReadOnlyDevice { name, kind } => CliError::Validation {
                field: "name".into(),
                reason: format!("{name} is a {kind} and cannot be controlled"),
            },

            CoreError::InvalidValue { value, reason } => CliError::Validation {
                field: "value".into(),
                reason: format!("{value:?}: {reason}"),
            },

            CoreError::InvalidScene { id } => CliError::Validation {
                field: "scene id".into(),
                reason: format!("{id:?} is not a UUID"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let unauthorized: CliError = CoreError::FatalUpstream {
            message: "unauthorized user".into(),
            status: Some(403),
        }
        .into();
        assert_eq!(unauthorized.exit_code(), exit_code::AUTH);

        let missing: CliError = CoreError::SceneNotFound { id: "x".into() }.into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let bad_value: CliError = CoreError::InvalidValue {
            value: "abc".into(),
            reason: "not numeric".into(),
        }
        .into();
        assert_eq!(bad_value.exit_code(), exit_code::USAGE);

        let offline: CliError = CoreError::TransientUpstream {
            message: "timed out".into(),
            status: None,
        }
        .into();
        assert_eq!(offline.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn unconfigured_points_at_config_file() {
        let err: CliError = ConfigError::NotConfigured {
            missing: "bridge.host".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::CONFIG);
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
