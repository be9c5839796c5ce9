//! Target directory snapshot
//!
//! One full enumeration of target groups and users, taken at the start of a
//! run. Groups are diffed against it instead of re-fetching; only groups and
//! users the run itself creates are added afterwards.

use std::collections::HashMap;
use tracing::{info, warn};

use glsync_connector::resilience::CallTimeout;
use glsync_connector::traits::TargetReader;
use glsync_connector::types::{RawTargetGroup, RawTargetUser, TargetId};

use crate::error::{SyncError, SyncResult};
use crate::model::{normalize_key, TargetGroup, TargetUser};

/// Frozen view of the target for one run.
#[derive(Debug, Clone, Default)]
pub struct TargetSnapshot {
    groups_by_name: HashMap<String, TargetGroup>,
    users_by_id: HashMap<TargetId, TargetUser>,
    /// Normalized external uid to user id, for the configured provider only.
    users_by_external_uid: HashMap<String, TargetId>,
}

impl TargetSnapshot {
    /// Enumerate the target. Either both listings complete or the run aborts.
    pub async fn build(
        reader: &dyn TargetReader,
        provider: &str,
        timeout: CallTimeout,
    ) -> SyncResult<Self> {
        let groups = timeout
            .run("list_groups", reader.list_groups())
            .await
            .map_err(|source| SyncError::Snapshot {
                stage: "list_groups",
                source,
            })?;

        let users = timeout
            .run("list_users", reader.list_users())
            .await
            .map_err(|source| SyncError::Snapshot {
                stage: "list_users",
                source,
            })?;

        let snapshot = Self::from_raw(groups, users, provider);
        info!(
            groups = snapshot.groups_by_name.len(),
            users = snapshot.users_by_id.len(),
            linked_users = snapshot.users_by_external_uid.len(),
            "Target snapshot built"
        );
        Ok(snapshot)
    }

    /// Index already-fetched listings.
    pub fn from_raw(
        groups: Vec<RawTargetGroup>,
        users: Vec<RawTargetUser>,
        provider: &str,
    ) -> Self {
        let mut snapshot = Self::default();

        for group in groups {
            if snapshot.groups_by_name.contains_key(&group.name) {
                warn!(group = %group.name, id = group.id, "Duplicate target group name, keeping first");
                continue;
            }
            snapshot
                .groups_by_name
                .insert(group.name.clone(), TargetGroup::from(group));
        }

        for user in users {
            snapshot.insert_user(TargetUser::from_raw(user, provider));
        }

        snapshot
    }

    /// Group by exact name.
    pub fn group(&self, name: &str) -> Option<&TargetGroup> {
        self.groups_by_name.get(name)
    }

    /// User by target id.
    pub fn user(&self, id: TargetId) -> Option<&TargetUser> {
        self.users_by_id.get(&id)
    }

    /// User linked to the given external uid (any spelling of the same DN).
    pub fn user_by_external_uid(&self, uid: &str) -> Option<&TargetUser> {
        self.users_by_external_uid
            .get(&normalize_key(uid))
            .and_then(|id| self.users_by_id.get(id))
    }

    /// Record a group, e.g. one created during the run.
    pub fn insert_group(&mut self, group: TargetGroup) {
        self.groups_by_name.insert(group.name.clone(), group);
    }

    /// Record a user and index its external identity.
    ///
    /// An external uid already claimed by another account keeps pointing at
    /// the first one.
    pub fn insert_user(&mut self, user: TargetUser) {
        if let Some(identity) = &user.external_identity {
            let key = identity.key();
            match self.users_by_external_uid.get(&key) {
                Some(existing) if *existing != user.id => {
                    warn!(
                        extern_uid = %identity.uid,
                        kept = *existing,
                        ignored = user.id,
                        "External uid linked to several accounts"
                    );
                }
                _ => {
                    self.users_by_external_uid.insert(key, user.id);
                }
            }
        }
        self.users_by_id.insert(user.id, user);
    }

    /// Mark `user_id` as a member of `group_name`. Returns false if it already was.
    pub fn add_membership(&mut self, group_name: &str, user_id: TargetId) -> bool {
        self.groups_by_name
            .get_mut(group_name)
            .is_some_and(|group| group.members.insert(user_id))
    }

    /// Drop `user_id` from `group_name`. Returns false if it was not a member.
    pub fn remove_membership(&mut self, group_name: &str, user_id: TargetId) -> bool {
        self.groups_by_name
            .get_mut(group_name)
            .is_some_and(|group| group.members.remove(&user_id))
    }

    pub fn group_count(&self) -> usize {
        self.groups_by_name.len()
    }

    pub fn user_count(&self) -> usize {
        self.users_by_id.len()
    }
}
