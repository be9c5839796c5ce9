//! GitLab client errors.

use glsync_connector::error::{ConflictKind, ConnectorError};
use thiserror::Error;

/// Errors raised by [`crate::client::GitLabClient`].
#[derive(Debug, Error)]
pub enum GitLabClientError {
    /// Client could not be built from the given settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    ParseError(String),

    /// 401 from the API.
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// 403 from the API.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 404 from the API.
    #[error("not found: {0}")]
    NotFound(String),

    /// The object already exists (409, or a 400 saying "has already been taken").
    #[error("{kind} conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },

    /// 429 from the API.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("GitLab API error ({status}): {detail}")]
    ApiError { status: u16, detail: String },
}

/// Result type for GitLab client calls.
pub type GitLabResult<T> = Result<T, GitLabClientError>;

impl GitLabClientError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GitLabClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            GitLabClientError::RateLimited { .. } => true,
            GitLabClientError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<GitLabClientError> for ConnectorError {
    fn from(err: GitLabClientError) -> Self {
        match err {
            GitLabClientError::InvalidConfig(message) => {
                ConnectorError::InvalidConfiguration { message }
            }
            GitLabClientError::Http(e) => {
                if e.is_connect() {
                    ConnectorError::connection_failed_with_source("GitLab unreachable", e)
                } else {
                    ConnectorError::network_with_source("GitLab request failed", e)
                }
            }
            GitLabClientError::ParseError(message) => ConnectorError::InvalidData { message },
            GitLabClientError::AuthError(_) => ConnectorError::AuthenticationFailed,
            GitLabClientError::Forbidden(operation) => {
                ConnectorError::AuthorizationFailed { operation }
            }
            GitLabClientError::NotFound(identifier) => {
                ConnectorError::ObjectNotFound { identifier }
            }
            GitLabClientError::Conflict { kind, message } => ConnectorError::Conflict { kind, message },
            GitLabClientError::RateLimited { retry_after_secs } => {
                ConnectorError::RateLimited { retry_after_secs }
            }
            GitLabClientError::ApiError { status, detail } if status >= 500 => {
                ConnectorError::TargetUnavailable {
                    message: format!("HTTP {status}: {detail}"),
                }
            }
            GitLabClientError::ApiError { status, detail } => {
                ConnectorError::operation_failed(format!("HTTP {status}: {detail}"))
            }
        }
    }
}
