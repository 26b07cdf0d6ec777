use thiserror::Error;

/// Coarse classification of an adapter failure.
///
/// The registry layer only needs to know *how* a call failed, not which
/// vendor or wire protocol produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The device could not be reached.
    Transport,
    /// The device was reached but rejected or failed the operation.
    Remote,
    /// The response did not match the expected schema.
    Parse,
    /// The adapter does not offer this capability.
    Unsupported,
}

/// Why a managed session could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    #[error("authentication rejected")]
    Authentication,

    #[error("timed out while connecting")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Top-level error type for the `fwdash-api` crate.
///
/// Covers every failure mode across all device API surfaces: the PAN-OS
/// command/XML API, the PAN-OS REST API, and the Junos REST RPC session.
/// `fwdash-core` degrades all of these to per-device log entries.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// DNS failure, connection refused, TLS failure, reset, etc.
    #[error("could not reach {url}: {message}")]
    Transport { url: String, message: String },

    /// Request exceeded the transport timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Remote ──────────────────────────────────────────────────────
    /// The device answered with an error (non-2xx, or an error envelope).
    #[error("device returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Credentials rejected by the device.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Managed session is not open; every call fails until reconnected.
    #[error("no session to {host}: {reason}")]
    SessionUnavailable { host: String, reason: SessionFailure },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be decoded, with the raw body for debugging.
    #[error("unexpected response: {message}")]
    Parse { message: String, body: String },

    // ── Capability ──────────────────────────────────────────────────
    /// Operation not offered by this vendor adapter.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    /// Normalize a `reqwest` failure into the adapter taxonomy.
    ///
    /// The raw `reqwest::Error` never escapes this crate.
    pub(crate) fn from_reqwest(url: &url::Url, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
            };
        }
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Build a parse error, keeping a bounded preview of the body in the message.
    pub(crate) fn parse(reason: impl std::fmt::Display, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Parse {
            message: format!("{reason} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }

    /// Which family of failure this is.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::InvalidUrl(_)
            | Self::Tls(_)
            | Self::SessionUnavailable { .. } => FailureKind::Transport,
            Self::Remote { .. } | Self::Authentication { .. } => FailureKind::Remote,
            Self::Parse { .. } => FailureKind::Parse,
            Self::Unsupported(_) => FailureKind::Unsupported,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
            || matches!(self, Self::Remote { status, .. } if *status >= 500)
    }

    /// HTTP status reported by the device, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let timeout = Error::Timeout {
            url: "https://fw1/api/".into(),
        };
        assert_eq!(timeout.kind(), FailureKind::Transport);
        assert!(timeout.is_transient());

        let remote = Error::Remote {
            status: 403,
            message: "Invalid credentials.".into(),
        };
        assert_eq!(remote.kind(), FailureKind::Remote);
        assert_eq!(remote.status(), Some(403));
        assert!(!remote.is_transient());

        let closed = Error::SessionUnavailable {
            host: "srx1".into(),
            reason: SessionFailure::Timeout,
        };
        assert_eq!(closed.kind(), FailureKind::Transport);
        assert_eq!(Error::Unsupported("tags").kind(), FailureKind::Unsupported);
    }

    #[test]
    fn parse_error_truncates_preview() {
        let body = "x".repeat(500);
        let Error::Parse { message, body: kept } = Error::parse("bad xml", &body) else {
            panic!("expected parse error");
        };
        assert!(message.len() < 300);
        assert_eq!(kept.len(), 500);
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(FailureKind::Unsupported.to_string(), "unsupported");
    }
}
