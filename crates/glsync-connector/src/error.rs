//! Connector error types
//!
//! Error definitions with transient/permanent classification, shared by the
//! directory and target connectors.

use std::fmt;

use thiserror::Error;

/// Which unique constraint a target system rejected a create call on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Another account already uses the email address.
    Email,
    /// Another account already uses the username.
    Username,
    /// A group with the same name or path already exists.
    Path,
    /// The user is already a member of the group.
    Membership,
    /// The target did not say which constraint failed.
    Other,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Email => write!(f, "email"),
            ConflictKind::Username => write!(f, "username"),
            ConflictKind::Path => write!(f, "path"),
            ConflictKind::Membership => write!(f, "membership"),
            ConflictKind::Other => write!(f, "other"),
        }
    }
}

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish connection to the remote system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A call did not complete within its time budget.
    #[error("{operation} timed out after {timeout_secs} seconds")]
    Timeout { operation: String, timeout_secs: u64 },

    /// Remote system is temporarily unavailable (5xx, busy, unwilling).
    #[error("remote system unavailable: {message}")]
    TargetUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote system asked us to slow down.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    // Authentication errors (permanent)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Operation errors
    /// Create or add call rejected because the object already exists.
    #[error("{kind} conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },

    /// Object not found in the remote system.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// Remote system returned data we could not interpret.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Operation failed for any other reason.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Check if this error is transient and the operation could succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::Timeout { .. }
                | ConnectorError::TargetUnavailable { .. }
                | ConnectorError::NetworkError { .. }
                | ConnectorError::RateLimited { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this is a timeout raised by a call budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectorError::Timeout { .. })
    }

    /// The conflict kind, if this is a conflict.
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            ConnectorError::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::RateLimited { .. } => "RATE_LIMITED",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::Conflict { .. } => "CONFLICT",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a conflict error.
    pub fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        ConnectorError::Conflict {
            kind,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient_errors = vec![
            ConnectorError::connection_failed("test"),
            ConnectorError::Timeout {
                operation: "list_users".to_string(),
                timeout_secs: 30,
            },
            ConnectorError::TargetUnavailable {
                message: "test".to_string(),
            },
            ConnectorError::RateLimited {
                retry_after_secs: Some(5),
            },
        ];

        for err in transient_errors {
            assert!(
                err.is_transient(),
                "Expected {} to be transient",
                err.error_code()
            );
            assert!(!err.is_permanent());
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent_errors = vec![
            ConnectorError::AuthenticationFailed,
            ConnectorError::invalid_configuration("test"),
            ConnectorError::conflict(ConflictKind::Email, "Email has already been taken"),
            ConnectorError::ObjectNotFound {
                identifier: "test".to_string(),
            },
        ];

        for err in permanent_errors {
            assert!(
                err.is_permanent(),
                "Expected {} to be permanent",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_conflict_kind() {
        let err = ConnectorError::conflict(ConflictKind::Email, "taken");
        assert_eq!(err.conflict_kind(), Some(ConflictKind::Email));
        assert_eq!(err.to_string(), "email conflict: taken");

        assert_eq!(ConnectorError::AuthenticationFailed.conflict_kind(), None);
    }

    #[test]
    fn test_timeout_display() {
        let err = ConnectorError::Timeout {
            operation: "create_user".to_string(),
            timeout_secs: 30,
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "create_user timed out after 30 seconds");
        assert_eq!(err.error_code(), "TIMEOUT");
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::new(std::io::ErrorKind::Other, "underlying error");
        let err = ConnectorError::connection_failed_with_source("failed", source_err);

        assert!(err.is_transient());
        if let ConnectorError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected ConnectionFailed variant");
        }
    }
}
