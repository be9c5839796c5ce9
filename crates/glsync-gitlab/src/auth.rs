//! GitLab API authentication: personal/private access token or OAuth token.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Credentials for the GitLab API.
///
/// The [`Debug`] impl redacts the token to prevent accidental credential
/// exposure in log output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "token", rename_all = "snake_case")]
pub enum GitLabAuth {
    /// Sent as the `PRIVATE-TOKEN` header.
    PrivateToken(String),
    /// Sent as `Authorization: Bearer <token>`.
    OAuthToken(String),
}

impl std::fmt::Debug for GitLabAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivateToken(_) => f.debug_tuple("PrivateToken").field(&"[REDACTED]").finish(),
            Self::OAuthToken(_) => f.debug_tuple("OAuthToken").field(&"[REDACTED]").finish(),
        }
    }
}

impl GitLabAuth {
    /// Attach the credentials to an outgoing request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::PrivateToken(token) => builder.header("PRIVATE-TOKEN", token),
            Self::OAuthToken(token) => builder.bearer_auth(token),
        }
    }

    /// Short name of the auth mode for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PrivateToken(_) => "private_token",
            Self::OAuthToken(_) => "oauth_token",
        }
    }
}
