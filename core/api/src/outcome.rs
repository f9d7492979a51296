//! The normalized result contract every remote operation resolves to.
//!
//! A remote call either succeeds with an optional payload or fails with a
//! [`Failure`] carrying the status code (absent when no response arrived) and
//! a display-ready reason. Expected failures never surface as panics.

use serde::Deserialize;
use thiserror::Error;

/// Status code of a successful response.
pub const STATUS_OK: u16 = 200;
/// Status code signalling that the session is absent or expired.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Result type alias for remote operations.
pub type ApiResult<T> = std::result::Result<T, Failure>;

/// A remote operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The service requires an authenticated session (401).
    #[error("(401) {reason}")]
    AuthRequired { reason: String },

    /// The service answered with any other non-success status.
    #[error("({status}) {reason}")]
    Rejected { status: u16, reason: String },

    /// No usable response: unreachable service or an unreadable body.
    #[error("{reason}")]
    Transport { reason: String },
}

impl Failure {
    /// Build a failure from a response status and the service's reason text.
    ///
    /// The reason is capitalized for display; an empty reason is replaced with
    /// a generic one naming the status.
    pub fn from_status(status: u16, reason: impl AsRef<str>) -> Self {
        let reason = match reason.as_ref().trim() {
            "" => format!("Request failed with status {}", status),
            text => capitalize(text),
        };

        if status == STATUS_UNAUTHORIZED {
            Self::AuthRequired { reason }
        } else {
            Self::Rejected { status, reason }
        }
    }

    /// Build a failure for a request that produced no response.
    pub fn transport(reason: impl AsRef<str>) -> Self {
        Self::Transport {
            reason: capitalize(reason.as_ref()),
        }
    }

    /// Build a failure for a response whose body could not be interpreted.
    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            reason: format!("Malformed response: {}", detail),
        }
    }

    /// Status code of the response, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthRequired { .. } => Some(STATUS_UNAUTHORIZED),
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    /// Display-ready reason text.
    pub fn reason(&self) -> &str {
        match self {
            Self::AuthRequired { reason }
            | Self::Rejected { reason, .. }
            | Self::Transport { reason } => reason,
        }
    }

    /// Whether this failure signals an absent or expired session.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}

/// Uppercase the first character of `text`.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Envelope status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// JSON envelope wrapping every non-binary response body.
///
/// `{"status":"success","data":...}` or `{"status":"error","reason":"..."}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub data: Option<T>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl<T> Envelope<T> {
    /// Normalize the envelope against the response status code.
    ///
    /// Success requires both a 2xx status and a success marker.
    pub fn into_result(self, status_code: u16) -> ApiResult<Option<T>> {
        let success = (200..300).contains(&status_code);
        match self.status {
            EnvelopeStatus::Success if success => Ok(self.data),
            _ => Err(Failure::from_status(
                status_code,
                self.reason.unwrap_or_default(),
            )),
        }
    }
}

/// Require a payload on a successful response.
pub fn require<T>(payload: Option<T>) -> ApiResult<T> {
    payload.ok_or_else(|| Failure::malformed("missing data"))
}
