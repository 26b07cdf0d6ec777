//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fwdash_config::ConfigError;
use fwdash_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device connection ────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(fwdash::connection_failed),
        help(
            "Check that the management interface is reachable from this host.\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(fwdash::timeout),
        help("Increase the timeout with --timeout or registry.timeout.")
    )]
    Timeout { url: String },

    #[error("The device rejected the stored credentials")]
    #[diagnostic(
        code(fwdash::auth_failed),
        help("Update them with: fwdash devices update <device> --password --key")
    )]
    AuthFailed { message: String },

    #[error("Device error ({code}): {message}")]
    #[diagnostic(code(fwdash::device_error))]
    DeviceError { code: String, message: String },

    #[error("{operation} are not available on this device")]
    #[diagnostic(
        code(fwdash::unsupported),
        help("PAN-OS object views need a stored REST API key; Junos devices expose facts and config only.")
    )]
    Unsupported { operation: String },

    // ── Registry ─────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fwdash::not_found),
        help("Run: fwdash {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fwdash::validation))]
    Validation { field: String, reason: String },

    #[error("Record store error: {message}")]
    #[diagnostic(
        code(fwdash::store),
        help("Check store.path in the config, or pass --store <PATH>.")
    )]
    Store { message: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("Could not decrypt a stored password")]
    #[diagnostic(
        code(fwdash::vault),
        help("The master passphrase in use is probably not the one the passwords were sealed with.")
    )]
    Vault,

    #[error("Master passphrase rotation aborted: {message}")]
    #[diagnostic(
        code(fwdash::rotation),
        help("No password was changed; the previous passphrase stays active.")
    )]
    Rotation { message: String },

    #[error("No master passphrase available")]
    #[diagnostic(
        code(fwdash::no_passphrase),
        help(
            "Export {env}, or store the passphrase in the system keyring\n\
             (service 'fwdash', user 'master-passphrase')."
        )
    )]
    NoMasterPassphrase { env: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(fwdash::config), help("Run: fwdash config validate"))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fwdash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML output: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoMasterPassphrase { .. } | Self::Vault => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(err) if matches!(**err, ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoMasterPassphrase { env } => Self::NoMasterPassphrase { env },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<fwdash_api::Error> for CliError {
    fn from(err: fwdash_api::Error) -> Self {
        use fwdash_api::{Error, SessionFailure};

        match err {
            Error::Transport { url, message } => Self::ConnectionFailed {
                url,
                reason: message,
            },
            Error::Tls(message) => Self::ConnectionFailed {
                url: "(tls setup)".into(),
                reason: message,
            },
            Error::Timeout { url } => Self::Timeout { url },
            Error::Authentication { message } => Self::AuthFailed { message },
            Error::SessionUnavailable { host, reason } => match reason {
                SessionFailure::Authentication => Self::AuthFailed {
                    message: format!("{host} refused the login"),
                },
                SessionFailure::Timeout => Self::Timeout { url: host },
                SessionFailure::Connection(reason) => Self::ConnectionFailed { url: host, reason },
            },
            Error::Remote {
                status: 401 | 403,
                message,
            } => Self::AuthFailed { message },
            Error::Remote { status, message } => Self::DeviceError {
                code: status.to_string(),
                message,
            },
            Error::Parse { message, .. } => Self::DeviceError {
                code: "parse".into(),
                message,
            },
            Error::InvalidUrl(e) => Self::Validation {
                field: "hostname".into(),
                reason: e.to_string(),
            },
            Error::Unsupported(operation) => Self::Unsupported {
                operation: operation.into(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::NotFound { entity, identifier } => {
                let resource_type = entity.to_lowercase();
                Self::NotFound {
                    list_command: format!("{resource_type}s list"),
                    resource_type,
                    identifier,
                }
            }

            CoreError::Store(e) => Self::Store {
                message: e.to_string(),
            },

            CoreError::Vault(_) => Self::Vault,

            CoreError::Device(e) => e.into(),

            CoreError::Rotation { message } => Self::Rotation { message },

            CoreError::Output { message } => Self::DeviceError {
                code: "output".into(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_credentials_map_to_auth_exit_code() {
        let err = CliError::from(fwdash_api::Error::Remote {
            status: 401,
            message: "API key rejected".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from(fwdash_api::Error::Remote {
            status: 500,
            message: "internal".into(),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
