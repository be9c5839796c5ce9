//! Connector capability traits
//!
//! The reconciliation engine talks to the outside world only through these
//! traits; the LDAP and GitLab crates implement them.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::operation::{Filter, RawEntry, SearchScope};
use crate::types::{AccessLevel, GroupSpec, RawTargetGroup, RawTargetUser, TargetId, UserSpec};

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the remote system.
    ///
    /// Returns `Ok(())` if the connection is successful, or an error describing
    /// what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Read access to the directory service (the source of truth).
#[async_trait]
pub trait DirectoryReader: Connector {
    /// Search for entries below `base` matching `filter`.
    ///
    /// # Arguments
    /// * `base` - The DN to start the search from
    /// * `filter` - The search filter to apply
    /// * `scope` - How deep to search
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        scope: SearchScope,
    ) -> ConnectorResult<Vec<RawEntry>>;

    /// Read a single entry by its DN.
    async fn get_entry(&self, dn: &str) -> ConnectorResult<Option<RawEntry>> {
        let entries = self
            .search(dn, &Filter::present("objectClass"), SearchScope::Base)
            .await?;
        Ok(entries.into_iter().next())
    }
}

/// Read access to the target service, used once per run to build the snapshot.
#[async_trait]
pub trait TargetReader: Connector {
    /// Enumerate every group with its current member ids.
    async fn list_groups(&self) -> ConnectorResult<Vec<RawTargetGroup>>;

    /// Enumerate every user with its identities.
    async fn list_users(&self) -> ConnectorResult<Vec<RawTargetUser>>;
}

/// Write access to the target service for corrective actions.
#[async_trait]
pub trait TargetMutator: Send + Sync {
    /// Create a group; fails with a `Path` conflict if it already exists.
    async fn create_group(&self, spec: &GroupSpec) -> ConnectorResult<TargetId>;

    /// Create a user; fails with an `Email` or `Username` conflict on collision.
    async fn create_user(&self, spec: &UserSpec) -> ConnectorResult<TargetId>;

    /// Add a user to a group; fails with a `Membership` conflict if already a member.
    async fn add_member(
        &self,
        group_id: TargetId,
        user_id: TargetId,
        access_level: AccessLevel,
    ) -> ConnectorResult<()>;

    /// Remove a user from a group.
    async fn remove_member(&self, group_id: TargetId, user_id: TargetId) -> ConnectorResult<()>;
}
