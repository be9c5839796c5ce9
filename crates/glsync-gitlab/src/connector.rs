//! GitLab as a reconciliation target.
//!
//! Wraps [`GitLabClient`] behind the [`TargetReader`] and [`TargetMutator`]
//! capability traits. Reads are retried on transient errors; writes are not.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

use glsync_connector::error::{ConnectorError, ConnectorResult};
use glsync_connector::resilience::{RetryConfig, RetryExecutor};
use glsync_connector::traits::{Connector, TargetMutator, TargetReader};
use glsync_connector::types::{
    AccessLevel, GroupSpec, RawIdentity, RawTargetGroup, RawTargetUser, TargetId, UserSpec,
};

use crate::client::GitLabClient;
use crate::models::{AddMemberRequest, ApiGroup, ApiUser, CreateGroupRequest, CreateUserRequest};

/// Member listings fetched in parallel while building a snapshot.
const MEMBER_FETCH_CONCURRENCY: usize = 4;

/// GitLab instance exposed through the connector traits.
#[derive(Debug, Clone)]
pub struct GitLabTarget {
    client: GitLabClient,
    retry: RetryExecutor,
    display_name: String,
}

impl GitLabTarget {
    /// Wrap a client with the default read retry policy.
    #[must_use]
    pub fn new(client: GitLabClient) -> Self {
        Self::with_retry(client, RetryConfig::default())
    }

    /// Wrap a client with a custom read retry policy.
    #[must_use]
    pub fn with_retry(client: GitLabClient, retry: RetryConfig) -> Self {
        let display_name = format!("GitLab: {}", client.api_url());
        Self {
            client,
            retry: RetryExecutor::new(retry),
            display_name,
        }
    }

    /// The underlying REST client.
    pub fn client(&self) -> &GitLabClient {
        &self.client
    }

    /// Username owning the configured token.
    pub async fn whoami(&self) -> ConnectorResult<String> {
        let user = self
            .retry
            .execute(|| async move {
                self.client
                    .current_user()
                    .await
                    .map_err(ConnectorError::from)
            })
            .await?;
        Ok(user.username)
    }

    async fn group_with_members(&self, group: ApiGroup) -> ConnectorResult<RawTargetGroup> {
        let group_id = group.id;
        let members = self
            .retry
            .execute(|| async move {
                self.client
                    .list_group_members(group_id)
                    .await
                    .map_err(ConnectorError::from)
            })
            .await?;

        Ok(RawTargetGroup {
            id: group.id,
            name: group.full_name,
            member_ids: members.into_iter().map(|m| m.id).collect(),
        })
    }
}

fn to_raw_user(user: ApiUser) -> RawTargetUser {
    RawTargetUser {
        id: user.id,
        username: user.username,
        name: user.name,
        email: user.email.unwrap_or_default(),
        identities: user
            .identities
            .into_iter()
            .map(|identity| RawIdentity {
                provider: identity.provider,
                extern_uid: identity.extern_uid,
            })
            .collect(),
    }
}

#[async_trait]
impl Connector for GitLabTarget {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let username = self.whoami().await?;
        info!(username = %username, "GitLab connection test successful");
        Ok(())
    }
}

#[async_trait]
impl TargetReader for GitLabTarget {
    #[instrument(skip(self))]
    async fn list_groups(&self) -> ConnectorResult<Vec<RawTargetGroup>> {
        let groups = self
            .retry
            .execute(|| async move {
                self.client
                    .list_groups()
                    .await
                    .map_err(ConnectorError::from)
            })
            .await?;

        debug!(count = groups.len(), "Fetched GitLab groups, loading members");

        // `buffered` keeps the listing order.
        let groups: Vec<RawTargetGroup> = stream::iter(groups)
            .map(|group| self.group_with_members(group))
            .buffered(MEMBER_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(groups)
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> ConnectorResult<Vec<RawTargetUser>> {
        let users = self
            .retry
            .execute(|| async move {
                self.client
                    .list_users()
                    .await
                    .map_err(ConnectorError::from)
            })
            .await?;

        debug!(count = users.len(), "Fetched GitLab users");

        Ok(users.into_iter().map(to_raw_user).collect())
    }
}

#[async_trait]
impl TargetMutator for GitLabTarget {
    #[instrument(skip(self, spec), fields(group = %spec.name))]
    async fn create_group(&self, spec: &GroupSpec) -> ConnectorResult<TargetId> {
        let request = CreateGroupRequest {
            name: &spec.name,
            path: &spec.path,
            visibility: spec.visibility.as_str(),
            description: spec.description.as_deref(),
        };
        let id = self.client.create_group(&request).await?;
        info!(group_id = id, "Created GitLab group");
        Ok(id)
    }

    #[instrument(skip(self, spec), fields(username = %spec.username))]
    async fn create_user(&self, spec: &UserSpec) -> ConnectorResult<TargetId> {
        let request = CreateUserRequest {
            email: &spec.email,
            username: &spec.username,
            name: &spec.name,
            provider: &spec.provider,
            extern_uid: &spec.extern_uid,
            force_random_password: true,
            skip_confirmation: true,
        };
        let id = self.client.create_user(&request).await?;
        info!(user_id = id, "Created GitLab user");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn add_member(
        &self,
        group_id: TargetId,
        user_id: TargetId,
        access_level: AccessLevel,
    ) -> ConnectorResult<()> {
        let request = AddMemberRequest {
            user_id,
            access_level: access_level.value(),
        };
        self.client.add_group_member(group_id, &request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, group_id: TargetId, user_id: TargetId) -> ConnectorResult<()> {
        self.client.remove_group_member(group_id, user_id).await?;
        Ok(())
    }
}
