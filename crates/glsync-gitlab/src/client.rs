//! GitLab REST v4 HTTP client (reqwest-based).
//!
//! Provides a `GitLabClient` covering the group, member and user endpoints
//! glsync needs, with offset pagination and status-code mapping.

use crate::auth::GitLabAuth;
use crate::error::{GitLabClientError, GitLabResult};
use crate::models::{
    AddMemberRequest, ApiGroup, ApiMember, ApiUser, CreateGroupRequest, CreateUserRequest,
    Created,
};
use glsync_connector::error::ConflictKind;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Items requested per page on list endpoints (GitLab's maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// GitLab REST client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    /// API root, e.g. `https://gitlab.example.com/api/v4`.
    api_url: String,
    /// Authentication handler.
    auth: GitLabAuth,
    /// Underlying HTTP client.
    http_client: Client,
    /// Page size for list endpoints.
    per_page: u32,
}

impl GitLabClient {
    /// Create a new GitLab client for the instance at `base_url`.
    pub fn new(
        base_url: &str,
        auth: GitLabAuth,
        timeout: Duration,
        tls_verify: bool,
    ) -> GitLabResult<Self> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GitLabClientError::InvalidConfig(format!(
                "GitLab URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!tls_verify)
            .user_agent(concat!("glsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GitLabClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self::with_http_client(base_url, auth, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: &str, auth: GitLabAuth, http_client: Client) -> Self {
        Self {
            api_url: api_url(base_url),
            auth,
            http_client,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Override the page size for list endpoints.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, DEFAULT_PER_PAGE);
        self
    }

    /// Get the API root URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ── Reads ─────────────────────────────────────────────────────────

    /// The user the token belongs to.
    pub async fn current_user(&self) -> GitLabResult<ApiUser> {
        let url = format!("{}/user", self.api_url);
        self.get(&url).await
    }

    /// Every group visible to the token.
    pub async fn list_groups(&self) -> GitLabResult<Vec<ApiGroup>> {
        let url = format!("{}/groups", self.api_url);
        self.get_all(&url, &[("all_available", "true")]).await
    }

    /// Direct members of a group.
    pub async fn list_group_members(&self, group_id: u64) -> GitLabResult<Vec<ApiMember>> {
        let url = format!("{}/groups/{}/members", self.api_url, group_id);
        self.get_all(&url, &[]).await
    }

    /// Every user, with identities when the token has admin scope.
    pub async fn list_users(&self) -> GitLabResult<Vec<ApiUser>> {
        let url = format!("{}/users", self.api_url);
        self.get_all(&url, &[]).await
    }

    // ── Writes ────────────────────────────────────────────────────────

    /// Create a group and return its id.
    pub async fn create_group(&self, request: &CreateGroupRequest<'_>) -> GitLabResult<u64> {
        let url = format!("{}/groups", self.api_url);
        let created: Created = self.post(&url, request).await?;
        Ok(created.id)
    }

    /// Create a user and return its id.
    pub async fn create_user(&self, request: &CreateUserRequest<'_>) -> GitLabResult<u64> {
        let url = format!("{}/users", self.api_url);
        let created: Created = self.post(&url, request).await?;
        Ok(created.id)
    }

    /// Add a user to a group.
    pub async fn add_group_member(
        &self,
        group_id: u64,
        request: &AddMemberRequest,
    ) -> GitLabResult<()> {
        let url = format!("{}/groups/{}/members", self.api_url, group_id);
        let _member: ApiMember = self.post(&url, request).await?;
        Ok(())
    }

    /// Remove a user from a group.
    pub async fn remove_group_member(&self, group_id: u64, user_id: u64) -> GitLabResult<()> {
        let url = format!("{}/groups/{}/members/{}", self.api_url, group_id, user_id);
        self.delete(&url).await
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: &str) -> GitLabResult<T> {
        debug!("GitLab GET {}", url);
        let builder = self.auth.apply(self.http_client.get(url));
        let response = builder.send().await?;
        self.handle_response(response).await
    }

    /// Follow `X-Next-Page` until the last page.
    async fn get_all<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> GitLabResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!("GitLab GET {} (page={})", url, page);
            let builder = self
                .http_client
                .get(url)
                .query(&[
                    ("per_page", self.per_page.to_string()),
                    ("page", page.to_string()),
                ])
                .query(params);
            let response = self.auth.apply(builder).send().await?;

            let next_page = response
                .headers()
                .get("X-Next-Page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let batch: Vec<T> = self.handle_response(response).await?;
            let batch_empty = batch.is_empty();
            items.extend(batch);

            match next_page {
                Some(next) if next > page && !batch_empty => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> GitLabResult<T> {
        debug!("GitLab POST {}", url);
        let builder = self.auth.apply(self.http_client.post(url));
        let response = builder.json(body).send().await?;
        self.handle_response(response).await
    }

    async fn delete(&self, url: &str) -> GitLabResult<()> {
        debug!("GitLab DELETE {}", url);
        let builder = self.auth.apply(self.http_client.delete(url));
        let response = builder.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> GitLabResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| GitLabClientError::ParseError(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> GitLabResult<T> {
        let status = response.status();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let detail = error_detail(&body, status);

        match status {
            StatusCode::CONFLICT => Err(GitLabClientError::Conflict {
                kind: classify_conflict(&detail),
                message: detail,
            }),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
                if detail.contains("has already been taken") =>
            {
                Err(GitLabClientError::Conflict {
                    kind: classify_conflict(&detail),
                    message: detail,
                })
            }
            StatusCode::NOT_FOUND => Err(GitLabClientError::NotFound(detail)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("GitLab rate limited, retry after {:?}s", retry_after);
                Err(GitLabClientError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            StatusCode::UNAUTHORIZED => Err(GitLabClientError::AuthError(format!(
                "Authentication failed (401): {detail}"
            ))),
            StatusCode::FORBIDDEN => Err(GitLabClientError::Forbidden(detail)),
            _ => Err(GitLabClientError::ApiError {
                status: status.as_u16(),
                detail,
            }),
        }
    }
}

/// `https://host/` -> `https://host/api/v4`; an explicit API root is kept.
fn api_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/api/v4") {
        base.to_string()
    } else {
        format!("{base}/api/v4")
    }
}

/// Pull GitLab's `message` (or `error`) out of an error body.
fn error_detail(body: &str, status: StatusCode) -> String {
    if body.trim().is_empty() {
        return format!("HTTP {status}");
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("message").or_else(|| value.get("error")) {
            Some(serde_json::Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

/// Decide which unique constraint a conflict message refers to.
pub(crate) fn classify_conflict(message: &str) -> ConflictKind {
    let lower = message.to_lowercase();
    if lower.contains("email") {
        ConflictKind::Email
    } else if lower.contains("username") {
        ConflictKind::Username
    } else if lower.contains("member already exists") || lower.contains("already a member") {
        ConflictKind::Membership
    } else if lower.contains("path") || lower.contains("name") {
        ConflictKind::Path
    } else {
        ConflictKind::Other
    }
}
