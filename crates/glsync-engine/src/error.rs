//! Reconciliation errors
//!
//! `SyncError` aborts a whole run. The other types are scoped to one group
//! or one member and end up in the run report instead of propagating.

use glsync_connector::error::ConnectorError;
use thiserror::Error;

/// Run-level failure. Raised before any mutation is attempted.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The directory group search itself failed.
    #[error("directory search under {base} failed: {source}")]
    Directory {
        base: String,
        #[source]
        source: ConnectorError,
    },

    /// Target enumeration could not complete; no partial snapshot is used.
    #[error("target snapshot failed during {stage}: {source}")]
    Snapshot {
        stage: &'static str,
        #[source]
        source: ConnectorError,
    },

    /// Settings or layout rejected before the run started.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl SyncError {
    /// The underlying connector error, if any.
    pub fn connector_error(&self) -> Option<&ConnectorError> {
        match self {
            SyncError::Directory { source, .. } | SyncError::Snapshot { source, .. } => {
                Some(source)
            }
            SyncError::InvalidSettings(_) => None,
        }
    }
}

/// Result type for run-level operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// A directory entry that cannot be normalized into a group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed group entry {dn}: {reason}")]
pub struct SchemaError {
    pub dn: String,
    pub reason: String,
}

impl SchemaError {
    pub fn new(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            reason: reason.into(),
        }
    }
}

/// Failure turning a directory entry into a [`crate::model::SourceGroup`].
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The entry itself is malformed; the group is skipped.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A bare member identifier could not be looked up; the group fails.
    #[error("member lookup for '{identifier}' failed: {source}")]
    Lookup {
        identifier: String,
        #[source]
        source: ConnectorError,
    },
}

/// Failure while processing one member of a group.
#[derive(Debug, Error)]
pub enum MemberError {
    /// The member's own directory entry could not be read.
    #[error("directory lookup for {member} failed: {source}")]
    Lookup {
        member: String,
        #[source]
        source: ConnectorError,
    },

    /// The member's directory entry does not exist.
    #[error("directory entry {member} not found")]
    EntryNotFound { member: String },

    /// The entry lacks an attribute needed to build an account.
    #[error("directory entry {member} has no {attribute} attribute")]
    MissingAttribute { member: String, attribute: String },

    /// The target rejected the account creation.
    #[error("user creation for {member} failed: {source}")]
    UserCreate {
        member: String,
        #[source]
        source: ConnectorError,
    },

    /// The target rejected the add-member call.
    #[error("adding {member} failed: {source}")]
    AddMember {
        member: String,
        #[source]
        source: ConnectorError,
    },

    /// The target rejected the remove-member call.
    #[error("removing {member} failed: {source}")]
    RemoveMember {
        member: String,
        #[source]
        source: ConnectorError,
    },
}

impl MemberError {
    /// Whether this failure concerns creating the target account.
    pub fn is_user_create(&self) -> bool {
        matches!(
            self,
            MemberError::UserCreate { .. }
                | MemberError::MissingAttribute { .. }
                | MemberError::EntryNotFound { .. }
                | MemberError::Lookup { .. }
        )
    }
}
