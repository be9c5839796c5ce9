//! Normalized directory and target model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use glsync_connector::types::{RawTargetGroup, RawTargetUser, TargetId};

/// Reference to a directory member, in resolvable (DN) form.
///
/// Equality and hashing go through [`MemberRef::key`], so `UID=u1, OU=People`
/// and `uid=u1,ou=people` are the same member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberRef(String);

impl MemberRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into().trim().to_string())
    }

    /// The reference as read from the directory.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Comparison key: lowercased, whitespace around `,` and `=` removed.
    pub fn key(&self) -> String {
        normalize_key(&self.0)
    }

    /// Whether this reference lies at or below `base`.
    pub fn is_under(&self, base: &str) -> bool {
        is_under(&self.key(), &normalize_key(base))
    }
}

impl PartialEq for MemberRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MemberRef {}

impl std::hash::Hash for MemberRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a distinguished name or identifier for comparison.
pub fn normalize_key(value: &str) -> String {
    value
        .split(',')
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, val)) => format!("{}={}", attr.trim(), val.trim()),
            None => rdn.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
        .to_lowercase()
}

/// `key` equals `base_key` or is a descendant of it. Both must be normalized.
pub(crate) fn is_under(key: &str, base_key: &str) -> bool {
    if base_key.is_empty() {
        return true;
    }
    key == base_key
        || key
            .strip_suffix(base_key)
            .is_some_and(|prefix| prefix.ends_with(','))
}

/// A directory group after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGroup {
    pub name: String,
    /// Empty when the directory has none.
    pub description: String,
    /// De-duplicated, in directory order.
    pub members: Vec<MemberRef>,
}

/// Link from a target user back to its directory identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub provider: String,
    pub uid: String,
}

impl ExternalIdentity {
    /// Normalized uid used as the snapshot index key.
    pub fn key(&self) -> String {
        normalize_key(&self.uid)
    }
}

/// A target user as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUser {
    pub id: TargetId,
    pub username: String,
    pub display_name: String,
    pub email: String,
    /// Identity for the configured provider, if the account has one.
    pub external_identity: Option<ExternalIdentity>,
}

impl TargetUser {
    /// Build from a raw user, keeping only the identity for `provider`.
    pub fn from_raw(raw: RawTargetUser, provider: &str) -> Self {
        let external_identity = raw
            .identities
            .into_iter()
            .find(|identity| identity.provider == provider)
            .map(|identity| ExternalIdentity {
                provider: identity.provider,
                uid: identity.extern_uid,
            });
        Self {
            id: raw.id,
            username: raw.username,
            display_name: raw.name,
            email: raw.email,
            external_identity,
        }
    }
}

/// A target group with the ids of its current members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub id: TargetId,
    pub name: String,
    pub members: BTreeSet<TargetId>,
}

impl TargetGroup {
    /// A group with no members, e.g. one just created.
    pub fn empty(id: TargetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    pub fn has_member(&self, user_id: TargetId) -> bool {
        self.members.contains(&user_id)
    }
}

impl From<RawTargetGroup> for TargetGroup {
    fn from(raw: RawTargetGroup) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            members: raw.member_ids.into_iter().collect(),
        }
    }
}
