//! Target-side types
//!
//! Raw groups and users as enumerated from the target service, and the
//! request shapes for corrective actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the target service. Immutable once assigned.
pub type TargetId = u64;

/// Visibility of a newly created target group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

impl Visibility {
    /// Wire value used by the target API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            "public" => Ok(Visibility::Public),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

/// Role granted to a member when added to a target group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Guest,
    Reporter,
    #[default]
    Developer,
    Maintainer,
    Owner,
}

impl AccessLevel {
    /// Numeric level used by the target API.
    pub fn value(&self) -> u8 {
        match self {
            AccessLevel::Guest => 10,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Guest => write!(f, "guest"),
            AccessLevel::Reporter => write!(f, "reporter"),
            AccessLevel::Developer => write!(f, "developer"),
            AccessLevel::Maintainer => write!(f, "maintainer"),
            AccessLevel::Owner => write!(f, "owner"),
        }
    }
}

/// One external identity linked to a target user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawIdentity {
    /// Identity provider name (e.g. `ldapmain`).
    pub provider: String,
    /// Identifier of the user inside that provider.
    pub extern_uid: String,
}

/// A user as enumerated from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTargetUser {
    pub id: TargetId,
    pub username: String,
    pub name: String,
    /// Empty when the target does not expose it to this token.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub identities: Vec<RawIdentity>,
}

/// A group as enumerated from the target, with its current member ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTargetGroup {
    pub id: TargetId,
    /// Name used for matching against directory groups.
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<TargetId>,
}

/// Request to create a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub path: String,
    pub visibility: Visibility,
    /// Sent only when present; an absent description keeps the target default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request to create a user linked to an external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub username: String,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub extern_uid: String,
}
