//! Shared error types for the services crate.

use aula_core::ErrorKind;
use aula_core::model::EvaluationId;
use reqwest::StatusCode;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use thiserror::Error;

use crate::evaluation::SessionPhase;

/// Errors emitted by `ApiClient` and the endpoint wrappers built on it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("missing or expired credentials")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("resource not found")]
    NotFound,
    #[error("request failed with status {status}: {detail}")]
    Server { status: StatusCode, detail: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::ServerError,
            ApiError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            ApiError::Http(err) if err.is_decode() => ErrorKind::MalformedResponse,
            ApiError::Http(_) => ErrorKind::Network,
        }
    }
}

/// Errors emitted by `EvaluationSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationSessionError {
    #[error("`{op}` is not allowed while the session is {phase:?}")]
    InvalidState {
        op: &'static str,
        phase: SessionPhase,
    },
    #[error("evaluation {requested} is not the one loaded in this session")]
    EvaluationMismatch { requested: EvaluationId },
    #[error("attempt is no longer in progress")]
    AttemptExpired,
    #[error("session was reset while `{op}` was in flight")]
    Superseded { op: &'static str },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl EvaluationSessionError {
    /// The kind recorded in session state, if this error drives one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EvaluationSessionError::Api(err) => Some(err.kind()),
            EvaluationSessionError::AttemptExpired => Some(ErrorKind::AttemptExpired),
            _ => None,
        }
    }
}

/// Errors emitted by `SessionState`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
