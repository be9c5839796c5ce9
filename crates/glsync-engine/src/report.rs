//! Run report
//!
//! Every run ends with a [`SyncReport`], whether or not individual groups
//! failed. Per-group results are collected as [`GroupOutcome`]s and folded
//! into the report in directory order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use glsync_connector::types::TargetId;

use crate::dry_run::PlannedAction;

/// Why a member was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No linked account and user creation is disabled.
    NoLinkedAccount,
    /// The account is already a member (e.g. two references to one user).
    AlreadyMember,
    /// Prune candidate without a provider identity under the user base.
    NotDirectoryUser,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoLinkedAccount => write!(f, "no linked account"),
            SkipReason::AlreadyMember => write!(f, "already a member"),
            SkipReason::NotDirectoryUser => write!(f, "not a directory user"),
        }
    }
}

/// A group that was not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    /// Group name, or the entry DN when no name could be read.
    pub group: String,
    pub reason: String,
}

/// An account created during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub member: String,
    pub user_id: TargetId,
    pub username: String,
    pub email: String,
    /// Email was rewritten to `local+gl-<username>@domain` after a conflict.
    pub email_adjusted: bool,
}

/// A membership added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberChange {
    pub group: String,
    /// Directory reference, or the target username for removals.
    pub member: String,
    pub user_id: TargetId,
}

/// A member left unchanged, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMember {
    pub group: String,
    pub member: String,
    pub reason: SkipReason,
}

/// A member-scoped failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFailure {
    pub group: String,
    pub member: String,
    pub reason: String,
}

/// Result of processing one directory group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: String,
    pub created: bool,
    /// Set when the group could not be processed at all.
    pub failure: Option<String>,
    /// Set when the entry was malformed and skipped.
    pub schema_error: Option<String>,
    pub users_created: Vec<CreatedUser>,
    pub users_failed: Vec<MemberFailure>,
    pub members_added: Vec<MemberChange>,
    pub members_removed: Vec<MemberChange>,
    pub members_skipped: Vec<SkippedMember>,
    pub members_failed: Vec<MemberFailure>,
}

impl GroupOutcome {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }

    /// Outcome for an entry that did not normalize.
    pub fn schema_skipped(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            group: dn.into(),
            schema_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Outcome for a group that failed before its members were touched.
    pub fn failed(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn skip(&mut self, member: impl Into<String>, reason: SkipReason) {
        self.members_skipped.push(SkippedMember {
            group: self.group.clone(),
            member: member.into(),
            reason,
        });
    }

    pub fn added(&mut self, member: impl Into<String>, user_id: TargetId) {
        self.members_added.push(MemberChange {
            group: self.group.clone(),
            member: member.into(),
            user_id,
        });
    }

    pub fn removed(&mut self, member: impl Into<String>, user_id: TargetId) {
        self.members_removed.push(MemberChange {
            group: self.group.clone(),
            member: member.into(),
            user_id,
        });
    }

    pub fn member_failed(&mut self, member: impl Into<String>, reason: impl Into<String>) {
        self.members_failed.push(MemberFailure {
            group: self.group.clone(),
            member: member.into(),
            reason: reason.into(),
        });
    }

    pub fn user_failed(&mut self, member: impl Into<String>, reason: impl Into<String>) {
        self.users_failed.push(MemberFailure {
            group: self.group.clone(),
            member: member.into(),
            reason: reason.into(),
        });
    }
}

/// Counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub groups_processed: usize,
    pub groups_created: usize,
    pub groups_failed: usize,
    pub groups_skipped: usize,
    pub users_created: usize,
    pub users_failed: usize,
    pub members_added: usize,
    pub members_removed: usize,
    pub members_skipped: usize,
    pub members_failed: usize,
}

/// Complete report of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// No write call reached the target.
    pub dry_run: bool,
    pub summary: ReportSummary,
    pub groups_created: Vec<String>,
    pub groups_failed: Vec<GroupFailure>,
    /// Entries skipped because they were malformed.
    pub groups_skipped: Vec<GroupFailure>,
    pub users_created: Vec<CreatedUser>,
    pub users_failed: Vec<MemberFailure>,
    pub members_added: Vec<MemberChange>,
    pub members_removed: Vec<MemberChange>,
    pub members_skipped: Vec<SkippedMember>,
    pub members_failed: Vec<MemberFailure>,
    /// Actions a dry run would have taken, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_actions: Vec<PlannedAction>,
}

impl SyncReport {
    /// Empty report for a run starting now.
    #[must_use]
    pub fn start(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            summary: ReportSummary::default(),
            groups_created: Vec::new(),
            groups_failed: Vec::new(),
            groups_skipped: Vec::new(),
            users_created: Vec::new(),
            users_failed: Vec::new(),
            members_added: Vec::new(),
            members_removed: Vec::new(),
            members_skipped: Vec::new(),
            members_failed: Vec::new(),
            planned_actions: Vec::new(),
        }
    }

    /// Fold one group's outcome into the report.
    pub fn record(&mut self, outcome: GroupOutcome) {
        if let Some(reason) = outcome.schema_error {
            self.groups_skipped.push(GroupFailure {
                group: outcome.group,
                reason,
            });
            self.summary.groups_skipped += 1;
            return;
        }

        self.summary.groups_processed += 1;
        if outcome.created {
            self.groups_created.push(outcome.group.clone());
            self.summary.groups_created += 1;
        }
        if let Some(reason) = outcome.failure {
            self.groups_failed.push(GroupFailure {
                group: outcome.group,
                reason,
            });
            self.summary.groups_failed += 1;
        }

        self.summary.users_created += outcome.users_created.len();
        self.summary.users_failed += outcome.users_failed.len();
        self.summary.members_added += outcome.members_added.len();
        self.summary.members_removed += outcome.members_removed.len();
        self.summary.members_skipped += outcome.members_skipped.len();
        self.summary.members_failed += outcome.members_failed.len();

        self.users_created.extend(outcome.users_created);
        self.users_failed.extend(outcome.users_failed);
        self.members_added.extend(outcome.members_added);
        self.members_removed.extend(outcome.members_removed);
        self.members_skipped.extend(outcome.members_skipped);
        self.members_failed.extend(outcome.members_failed);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether any group, user or member failed.
    pub fn has_failures(&self) -> bool {
        !self.groups_failed.is_empty()
            || !self.users_failed.is_empty()
            || !self.members_failed.is_empty()
    }

    /// Whether the run changed (or in a dry run, would change) the target.
    pub fn has_changes(&self) -> bool {
        self.summary.groups_created > 0
            || self.summary.users_created > 0
            || self.summary.members_added > 0
            || self.summary.members_removed > 0
    }

    /// Run duration in milliseconds, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        if self.dry_run {
            write!(f, "[dry run] ")?;
        }
        write!(
            f,
            "groups: {} processed, {} created, {} failed, {} skipped; \
             users: {} created, {} failed; \
             members: {} added, {} removed, {} skipped, {} failed",
            s.groups_processed,
            s.groups_created,
            s.groups_failed,
            s.groups_skipped,
            s.users_created,
            s.users_failed,
            s.members_added,
            s.members_removed,
            s.members_skipped,
            s.members_failed,
        )
    }
}
