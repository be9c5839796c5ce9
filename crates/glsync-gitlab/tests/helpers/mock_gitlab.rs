//! Wiremock fixtures for the GitLab v4 API.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glsync_connector::resilience::RetryConfig;
use glsync_gitlab::{GitLabAuth, GitLabClient, GitLabTarget};
use std::time::Duration;

pub const TOKEN: &str = "glpat-test-token";

/// Client talking to `server` with a private token.
pub fn client(server: &MockServer) -> GitLabClient {
    GitLabClient::with_http_client(
        &server.uri(),
        GitLabAuth::PrivateToken(TOKEN.to_string()),
        reqwest::Client::new(),
    )
}

/// Target with fast retries so transient-error tests stay quick.
pub fn target(server: &MockServer) -> GitLabTarget {
    GitLabTarget::with_retry(
        client(server),
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        },
    )
}

pub fn group_json(id: u64, full_name: &str) -> Value {
    json!({
        "id": id,
        "name": full_name.rsplit(" / ").next().unwrap_or(full_name),
        "full_name": full_name,
        "path": full_name.to_lowercase().replace(' ', "-"),
        "full_path": full_name.to_lowercase().replace(' ', "-"),
        "visibility": "private"
    })
}

pub fn member_json(id: u64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "name": username,
        "state": "active",
        "access_level": 30
    })
}

pub fn user_json(id: u64, username: &str, ldap_dn: Option<&str>) -> Value {
    let identities = match ldap_dn {
        Some(dn) => json!([{ "provider": "ldapmain", "extern_uid": dn }]),
        None => json!([]),
    };
    json!({
        "id": id,
        "username": username,
        "name": username.to_uppercase(),
        "email": format!("{username}@example.com"),
        "state": "active",
        "identities": identities
    })
}

/// Mount a single-page list response for `endpoint`.
pub async fn mount_single_page(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Next-Page", "")
                .set_body_json(body),
        )
        .mount(server)
        .await;
}

/// Mount page `page` of a paginated list response for `endpoint`.
pub async fn mount_page(server: &MockServer, endpoint: &str, page: u32, next: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Next-Page", next)
                .set_body_json(body),
        )
        .expect(1)
        .mount(server)
        .await;
}
