//! Run settings
//!
//! `SyncSettings` controls what the engine is allowed to do to the target;
//! `DirectoryLayout` describes where groups and users live in the directory
//! and which attributes carry what.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use glsync_connector::types::{AccessLevel, Visibility};

use crate::error::{SyncError, SyncResult};

/// Behavior of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Identity provider name target users are linked under.
    #[serde(default = "default_provider")]
    pub ldap_provider: String,

    /// Create target accounts for directory members with no linked account.
    #[serde(default)]
    pub create_users: bool,

    /// Visibility of newly created groups.
    #[serde(default)]
    pub group_visibility: Visibility,

    /// Copy the directory description onto newly created groups.
    #[serde(default = "default_true")]
    pub add_description: bool,

    /// Role granted to added members.
    #[serde(default)]
    pub access_level: AccessLevel,

    /// Remove target members that left the directory group.
    #[serde(default)]
    pub prune: bool,

    /// Plan and report actions without calling the target's write API.
    #[serde(default)]
    pub dry_run: bool,

    /// Number of groups processed at the same time.
    #[serde(default = "default_group_concurrency")]
    pub group_concurrency: usize,

    /// Budget for each directory or target call, in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Budget for enumerating the whole target at the start of a run, in
    /// seconds. Individual requests stay bounded by the connector.
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_secs: u64,
}

fn default_provider() -> String {
    "ldapmain".to_string()
}

fn default_true() -> bool {
    true
}

fn default_group_concurrency() -> usize {
    1
}

fn default_call_timeout() -> u64 {
    30
}

fn default_snapshot_timeout() -> u64 {
    900
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            ldap_provider: default_provider(),
            create_users: false,
            group_visibility: Visibility::default(),
            add_description: default_true(),
            access_level: AccessLevel::default(),
            prune: false,
            dry_run: false,
            group_concurrency: default_group_concurrency(),
            call_timeout_secs: default_call_timeout(),
            snapshot_timeout_secs: default_snapshot_timeout(),
        }
    }
}

impl SyncSettings {
    /// Per-call timeout as a Duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Snapshot enumeration budget as a Duration.
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.ldap_provider.trim().is_empty() {
            return Err(SyncError::InvalidSettings(
                "sync.ldap_provider must not be empty".to_string(),
            ));
        }
        if self.group_concurrency == 0 {
            return Err(SyncError::InvalidSettings(
                "sync.group_concurrency must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(SyncError::InvalidSettings(
                "sync.call_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.snapshot_timeout_secs == 0 {
            return Err(SyncError::InvalidSettings(
                "sync.snapshot_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where groups and users live in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLayout {
    /// Search base for groups.
    pub groups_base_dn: String,

    /// Search base for users; also the subtree members must fall under.
    pub users_base_dn: String,

    /// Object classes a group entry may carry.
    #[serde(default = "default_group_object_classes")]
    pub group_object_classes: Vec<String>,

    /// Object classes a user entry may carry (used for identifier lookups).
    #[serde(default = "default_user_object_classes")]
    pub user_object_classes: Vec<String>,

    /// Pattern on the group name attribute; `*` matches everything.
    #[serde(default = "default_group_name_filter")]
    pub group_name_filter: String,

    /// Extra filter ANDed into identifier lookups, e.g. `(!(loginShell=/bin/false))`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_filter: Option<String>,

    /// Attribute holding the group name.
    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,

    /// Attribute holding the group description.
    #[serde(default = "default_description_attribute")]
    pub description_attribute: String,

    /// Attribute bare member identifiers are matched against.
    #[serde(default = "default_user_naming_attribute")]
    pub user_naming_attribute: String,

    /// Attributes tried in order for the target username.
    #[serde(default = "default_username_attributes")]
    pub username_attributes: Vec<String>,

    /// Attributes tried in order for the display name.
    #[serde(default = "default_display_name_attributes")]
    pub display_name_attributes: Vec<String>,

    /// Attribute holding the email address.
    #[serde(default = "default_mail_attribute")]
    pub mail_attribute: String,
}

fn default_group_object_classes() -> Vec<String> {
    vec![
        "groupOfUniqueNames".to_string(),
        "posixGroup".to_string(),
        "groupOfNames".to_string(),
    ]
}

fn default_user_object_classes() -> Vec<String> {
    vec!["posixAccount".to_string(), "inetOrgPerson".to_string()]
}

fn default_group_name_filter() -> String {
    "*".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

fn default_description_attribute() -> String {
    "description".to_string()
}

fn default_user_naming_attribute() -> String {
    "uid".to_string()
}

fn default_username_attributes() -> Vec<String> {
    vec!["uid".to_string(), "sAMAccountName".to_string()]
}

fn default_display_name_attributes() -> Vec<String> {
    vec!["cn".to_string(), "displayName".to_string()]
}

fn default_mail_attribute() -> String {
    "mail".to_string()
}

impl DirectoryLayout {
    /// Layout with default attribute names for the given bases.
    pub fn new(groups_base_dn: impl Into<String>, users_base_dn: impl Into<String>) -> Self {
        Self {
            groups_base_dn: groups_base_dn.into(),
            users_base_dn: users_base_dn.into(),
            group_object_classes: default_group_object_classes(),
            user_object_classes: default_user_object_classes(),
            group_name_filter: default_group_name_filter(),
            user_filter: None,
            group_name_attribute: default_group_name_attribute(),
            description_attribute: default_description_attribute(),
            user_naming_attribute: default_user_naming_attribute(),
            username_attributes: default_username_attributes(),
            display_name_attributes: default_display_name_attributes(),
            mail_attribute: default_mail_attribute(),
        }
    }

    /// Set the extra user filter.
    #[must_use]
    pub fn with_user_filter(mut self, filter: impl Into<String>) -> Self {
        self.user_filter = Some(filter.into());
        self
    }

    /// Set the group name pattern.
    #[must_use]
    pub fn with_group_name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.group_name_filter = pattern.into();
        self
    }

    /// Reject layouts that cannot produce a meaningful search.
    pub fn validate(&self) -> SyncResult<()> {
        if self.groups_base_dn.trim().is_empty() {
            return Err(SyncError::InvalidSettings(
                "ldap.groups_base_dn is required".to_string(),
            ));
        }
        if self.users_base_dn.trim().is_empty() {
            return Err(SyncError::InvalidSettings(
                "ldap.users_base_dn is required".to_string(),
            ));
        }
        if self.group_object_classes.is_empty() {
            return Err(SyncError::InvalidSettings(
                "ldap.group_object_classes must list at least one class".to_string(),
            ));
        }
        if self.username_attributes.is_empty() {
            return Err(SyncError::InvalidSettings(
                "ldap.username_attributes must list at least one attribute".to_string(),
            ));
        }
        Ok(())
    }
}
