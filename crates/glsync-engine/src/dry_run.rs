//! Dry-run mutator
//!
//! Stands in for the target's write API. Every call is logged and recorded;
//! creations return synthetic ids so the rest of the run can proceed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::info;

use glsync_connector::error::ConnectorResult;
use glsync_connector::traits::TargetMutator;
use glsync_connector::types::{AccessLevel, GroupSpec, TargetId, UserSpec, Visibility};

/// First synthetic id; far above anything a real target hands out.
pub const SYNTHETIC_ID_BASE: TargetId = 1 << 62;

/// A write the run would have made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    CreateGroup {
        name: String,
        path: String,
        visibility: Visibility,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    CreateUser {
        username: String,
        email: String,
        extern_uid: String,
    },
    AddMember {
        group_id: TargetId,
        user_id: TargetId,
        access_level: AccessLevel,
    },
    RemoveMember {
        group_id: TargetId,
        user_id: TargetId,
    },
}

/// Recording [`TargetMutator`] used when `dry_run` is set.
#[derive(Debug)]
pub struct DryRunMutator {
    next_id: AtomicU64,
    actions: Mutex<Vec<PlannedAction>>,
}

impl Default for DryRunMutator {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunMutator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(SYNTHETIC_ID_BASE),
            actions: Mutex::new(Vec::new()),
        }
    }

    /// Recorded actions, in call order.
    pub async fn actions(&self) -> Vec<PlannedAction> {
        self.actions.lock().await.clone()
    }

    fn allocate_id(&self) -> TargetId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn record(&self, action: PlannedAction) {
        self.actions.lock().await.push(action);
    }
}

#[async_trait]
impl TargetMutator for DryRunMutator {
    async fn create_group(&self, spec: &GroupSpec) -> ConnectorResult<TargetId> {
        let id = self.allocate_id();
        info!(group = %spec.name, visibility = %spec.visibility, "[dry run] would create group");
        self.record(PlannedAction::CreateGroup {
            name: spec.name.clone(),
            path: spec.path.clone(),
            visibility: spec.visibility,
            description: spec.description.clone(),
        })
        .await;
        Ok(id)
    }

    async fn create_user(&self, spec: &UserSpec) -> ConnectorResult<TargetId> {
        let id = self.allocate_id();
        info!(
            username = %spec.username,
            extern_uid = %spec.extern_uid,
            "[dry run] would create user"
        );
        self.record(PlannedAction::CreateUser {
            username: spec.username.clone(),
            email: spec.email.clone(),
            extern_uid: spec.extern_uid.clone(),
        })
        .await;
        Ok(id)
    }

    async fn add_member(
        &self,
        group_id: TargetId,
        user_id: TargetId,
        access_level: AccessLevel,
    ) -> ConnectorResult<()> {
        info!(group_id, user_id, %access_level, "[dry run] would add member");
        self.record(PlannedAction::AddMember {
            group_id,
            user_id,
            access_level,
        })
        .await;
        Ok(())
    }

    async fn remove_member(&self, group_id: TargetId, user_id: TargetId) -> ConnectorResult<()> {
        info!(group_id, user_id, "[dry run] would remove member");
        self.record(PlannedAction::RemoveMember { group_id, user_id })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_actions_with_synthetic_ids() {
        let mutator = DryRunMutator::new();

        let group_id = mutator
            .create_group(&GroupSpec {
                name: "phys-eth".to_string(),
                path: "phys-eth".to_string(),
                visibility: Visibility::Private,
                description: None,
            })
            .await
            .unwrap();
        let user_id = mutator
            .create_user(&UserSpec {
                username: "u1".to_string(),
                name: "User One".to_string(),
                email: "u1@example.com".to_string(),
                provider: "ldapmain".to_string(),
                extern_uid: "uid=u1,ou=people,dc=example,dc=com".to_string(),
            })
            .await
            .unwrap();
        mutator
            .add_member(group_id, user_id, AccessLevel::Developer)
            .await
            .unwrap();

        assert_eq!(group_id, SYNTHETIC_ID_BASE);
        assert_eq!(user_id, SYNTHETIC_ID_BASE + 1);

        let actions = mutator.actions().await;
        assert_eq!(actions.len(), 3);
        assert!(matches!(&actions[0], PlannedAction::CreateGroup { name, .. } if name == "phys-eth"));
        assert_eq!(
            actions[2],
            PlannedAction::AddMember {
                group_id,
                user_id,
                access_level: AccessLevel::Developer,
            }
        );
    }

    #[test]
    fn test_planned_action_json_shape() {
        let json = serde_json::to_value(PlannedAction::RemoveMember {
            group_id: 1,
            user_id: 2,
        })
        .unwrap();
        assert_eq!(json["action"], "remove_member");
        assert_eq!(json["user_id"], 2);
    }
}
