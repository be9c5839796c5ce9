//! # Connector Framework
//!
//! Capability traits and shared types for the two systems glsync talks to:
//! a directory service that is the source of truth for group membership, and
//! a target collaboration service that is kept in line with it.
//!
//! ## Architecture
//!
//! - [`DirectoryReader`] - Search the directory for raw entries
//! - [`TargetReader`] - Enumerate target groups and users
//! - [`TargetMutator`] - Create groups and users, add and remove members
//!
//! Implementations live in `glsync-ldap` and `glsync-gitlab`; the
//! reconciliation engine in `glsync-engine` depends only on these traits.
//!
//! ## Crate Organization
//!
//! - [`types`] - Target-side raw types and request specs
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector capability traits
//! - [`operation`] - Directory operation types (Filter, `RawEntry`)
//! - [`config`] - Shared connection settings
//! - [`resilience`] - Call timeouts and read retries
//!
//! [`DirectoryReader`]: traits::DirectoryReader
//! [`TargetReader`]: traits::TargetReader
//! [`TargetMutator`]: traits::TargetMutator

pub mod config;
pub mod error;
pub mod operation;
pub mod resilience;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use glsync_connector::prelude::*;
/// ```
pub mod prelude {
    // Types and enums
    pub use crate::types::{
        AccessLevel, GroupSpec, RawIdentity, RawTargetGroup, RawTargetUser, TargetId, UserSpec,
        Visibility,
    };

    // Error handling
    pub use crate::error::{ConflictKind, ConnectorError, ConnectorResult};

    // Traits
    pub use crate::traits::{Connector, DirectoryReader, TargetMutator, TargetReader};

    // Operations
    pub use crate::operation::{Filter, RawEntry, SearchScope};

    // Configuration
    pub use crate::config::ConnectionSettings;

    // Resilience
    pub use crate::resilience::{CallTimeout, RetryConfig, RetryExecutor};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
