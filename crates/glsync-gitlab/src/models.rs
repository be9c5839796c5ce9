//! GitLab REST API payloads (the subset glsync reads and writes).

use serde::{Deserialize, Serialize};

/// Group as returned by `GET /groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiGroup {
    pub id: u64,
    pub name: String,
    /// Human-readable path including parents, e.g. `Parent / Child`.
    pub full_name: String,
    pub path: String,
    #[serde(default)]
    pub full_path: String,
}

/// Group member as returned by `GET /groups/:id/members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMember {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub access_level: u8,
}

/// External identity attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiIdentity {
    pub provider: String,
    pub extern_uid: String,
}

/// User as returned by `GET /users` (admin view includes identities and email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: u64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub identities: Vec<ApiIdentity>,
}

/// Body of `POST /groups`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub visibility: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub name: &'a str,
    pub provider: &'a str,
    pub extern_uid: &'a str,
    pub force_random_password: bool,
    pub skip_confirmation: bool,
}

/// Body of `POST /groups/:id/members`.
#[derive(Debug, Clone, Serialize)]
pub struct AddMemberRequest {
    pub user_id: u64,
    pub access_level: u8,
}

/// Any response carrying an `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    pub id: u64,
}
