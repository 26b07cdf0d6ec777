// ── Core error types ──
//
// Everything a registry operation can fail with. Adapter, store and vault
// errors are wrapped rather than flattened so operators keep the full
// detail in logs; `failure()` produces the redacted form shown to users.

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::vault::VaultError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// Bad input (short key, unknown site, duplicate name or hostname).
    /// Raised before any store write.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Credential error: {0}")]
    Vault(#[from] VaultError),

    #[error("Device API error: {0}")]
    Device(#[from] fwdash_api::Error),

    // ── Rotation ─────────────────────────────────────────────────────
    /// Master password rotation was abandoned; the active passphrase is
    /// unchanged.
    #[error("Master password rotation aborted: {message}")]
    Rotation { message: String },

    // ── Object views ─────────────────────────────────────────────────
    #[error("Unexpected device output: {message}")]
    Output { message: String },
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }

    /// True for input errors the caller can fix.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// The user-facing `{ result: "Failure", message }` form.
    ///
    /// Validation messages are passed through; everything else is replaced
    /// by a generic sentence so hostnames, URLs and store paths stay in the
    /// log only.
    pub fn failure(&self) -> Failure {
        let message = match self {
            Self::Validation { message } => message.clone(),
            Self::NotFound { entity, .. } => format!("{entity} not found"),
            Self::Store(_) => "Problems reading from or writing to the database".into(),
            Self::Vault(_) => "Stored credentials could not be decrypted".into(),
            Self::Device(e) => match e.kind() {
                fwdash_api::FailureKind::Transport => "The device could not be reached".into(),
                fwdash_api::FailureKind::Remote => "The device rejected the request".into(),
                fwdash_api::FailureKind::Parse => {
                    "The device returned an unexpected response".into()
                }
                fwdash_api::FailureKind::Unsupported => {
                    "This device does not support the requested operation".into()
                }
            },
            Self::Rotation { .. } => {
                "Master password rotation failed; no credentials were changed".into()
            }
            Self::Output { .. } => "The device returned an unexpected response".into(),
        };
        Failure::new(message)
    }
}

/// Route-boundary failure document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub result: &'static str,
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            result: "Failure",
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_hides_transport_detail() {
        let err = CoreError::Device(fwdash_api::Error::Transport {
            url: "https://10.0.0.1/api/".into(),
            message: "tcp connect error: Connection refused".into(),
        });
        let failure = err.failure();
        assert_eq!(failure.result, "Failure");
        assert!(!failure.message.contains("10.0.0.1"));
    }

    #[test]
    fn failure_keeps_validation_message() {
        let err = CoreError::validation("Key must be at least 32 characters");
        assert!(err.is_validation());
        assert_eq!(err.failure().message, "Key must be at least 32 characters");
    }

    #[test]
    fn failure_serializes_with_result_field() {
        let json = serde_json::to_value(Failure::new("nope")).unwrap_or_default();
        assert_eq!(json["result"], "Failure");
        assert_eq!(json["message"], "nope");
    }
}
