//! # Reconciliation Engine
//!
//! Brings target group membership in line with the directory.
//!
//! A run goes through four stages:
//!
//! 1. [`directory`] searches the directory for group entries and normalizes
//!    each schema variant into a [`model::SourceGroup`].
//! 2. [`snapshot`] enumerates the target once into a [`snapshot::TargetSnapshot`].
//! 3. [`resolver`] maps members to target accounts by external identity,
//!    creating accounts when allowed.
//! 4. [`engine`] diffs each group and applies the corrective actions, with
//!    failures isolated per group and per member.
//!
//! The outcome of every run is a [`report::SyncReport`].

pub mod directory;
pub mod dry_run;
pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod resolver;
pub mod settings;
pub mod snapshot;

pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use report::SyncReport;
pub use settings::{DirectoryLayout, SyncSettings};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::directory::{DirectoryModel, GroupSchema};
    pub use crate::dry_run::{DryRunMutator, PlannedAction};
    pub use crate::engine::SyncEngine;
    pub use crate::error::{MemberError, NormalizeError, SchemaError, SyncError, SyncResult};
    pub use crate::model::{MemberRef, SourceGroup, TargetGroup, TargetUser};
    pub use crate::report::{GroupOutcome, SkipReason, SyncReport};
    pub use crate::resolver::{IdentityResolver, Resolution};
    pub use crate::settings::{DirectoryLayout, SyncSettings};
    pub use crate::snapshot::TargetSnapshot;
}
