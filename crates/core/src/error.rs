use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, retained in session state for display.
///
/// Every layer maps its own error type onto one of these so the UI can decide
/// whether to redirect to login, show a soft message or offer a retry.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Credentials are missing or expired. Never retried silently.
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// 5xx responses and business-rule rejections (e.g. attempts exhausted).
    #[error("server error")]
    ServerError,

    #[error("malformed response")]
    MalformedResponse,

    /// The backend reports the attempt is no longer in progress.
    #[error("attempt expired")]
    AttemptExpired,

    /// The request never produced an HTTP response.
    #[error("network failure")]
    Network,
}

impl ErrorKind {
    /// Returns true when the caller should send the user back to login.
    #[must_use]
    pub fn is_session_ending(self) -> bool {
        matches!(self, ErrorKind::Unauthorized)
    }

    /// Returns true for failures that can be rendered as a soft message.
    #[must_use]
    pub fn is_soft(self) -> bool {
        matches!(self, ErrorKind::Forbidden)
    }
}
