//! CLI error types and exit codes

use thiserror::Error;

use glsync_connector::error::ConnectorError;
use glsync_engine::SyncError;
use glsync_gitlab::GitLabClientError;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General or configuration error
/// - 2: Authentication failed
/// - 3: Network error
/// - 4: Validation error
/// - 5: Server error
/// - 6: Run completed with failures
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Sync aborted: {0}")]
    SyncAborted(String),

    #[error("Sync finished with {0} failure(s)")]
    CompletedWithFailures(usize),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Io(_) | CliError::SyncAborted(_) => 1,
            CliError::AuthenticationFailed(_) => 2,
            CliError::Network(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Server(_) => 5,
            CliError::CompletedWithFailures(_) => 6,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => Some("Run 'glsync init' to write a starting configuration."),
            CliError::AuthenticationFailed(_) => {
                Some("Check the LDAP bind credentials and the GitLab token.")
            }
            CliError::Network(_) => Some("Run 'glsync check' to test both connections."),
            CliError::CompletedWithFailures(_) => {
                Some("See the report for the failed groups and members.")
            }
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Read { .. } | ConfigError::Write { .. } => CliError::Io(e.to_string()),
            _ => CliError::Config(e.to_string()),
        }
    }
}

impl From<ConnectorError> for CliError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::AuthenticationFailed | ConnectorError::AuthorizationFailed { .. } => {
                CliError::AuthenticationFailed(e.to_string())
            }
            ConnectorError::ConnectionFailed { .. }
            | ConnectorError::NetworkError { .. }
            | ConnectorError::Timeout { .. } => CliError::Network(e.to_string()),
            ConnectorError::TargetUnavailable { .. } | ConnectorError::RateLimited { .. } => {
                CliError::Server(e.to_string())
            }
            ConnectorError::InvalidConfiguration { .. } => CliError::Config(e.to_string()),
            _ => CliError::Validation(e.to_string()),
        }
    }
}

impl From<GitLabClientError> for CliError {
    fn from(e: GitLabClientError) -> Self {
        CliError::from(ConnectorError::from(e))
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::InvalidSettings(message) => CliError::Config(message),
            SyncError::Directory { source, .. } | SyncError::Snapshot { source, .. }
                if matches!(
                    source,
                    ConnectorError::AuthenticationFailed
                        | ConnectorError::AuthorizationFailed { .. }
                ) =>
            {
                CliError::AuthenticationFailed(source.to_string())
            }
            other => CliError::SyncAborted(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}
