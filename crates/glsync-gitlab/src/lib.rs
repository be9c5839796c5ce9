//! # GitLab Target
//!
//! REST client for the GitLab v4 API and the [`GitLabTarget`] connector the
//! reconciliation engine reads from and writes to.
//!
//! ```ignore
//! use glsync_gitlab::{GitLabAuth, GitLabClient, GitLabTarget};
//!
//! let client = GitLabClient::new(
//!     "https://gitlab.example.com",
//!     GitLabAuth::PrivateToken(token),
//!     Duration::from_secs(30),
//!     true,
//! )?;
//! let target = GitLabTarget::new(client);
//! target.test_connection().await?;
//! ```

pub mod auth;
pub mod client;
pub mod connector;
pub mod error;
pub mod models;

pub use auth::GitLabAuth;
pub use client::GitLabClient;
pub use connector::GitLabTarget;
pub use error::{GitLabClientError, GitLabResult};
