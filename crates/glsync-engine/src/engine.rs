//! Reconciliation engine
//!
//! One run: search the directory, snapshot the target, then bring each
//! directory group's target counterpart in line with it. Groups are
//! independent; a failure in one never stops the others.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use glsync_connector::error::ConflictKind;
use glsync_connector::operation::RawEntry;
use glsync_connector::resilience::CallTimeout;
use glsync_connector::traits::{DirectoryReader, TargetMutator, TargetReader};
use glsync_connector::types::{GroupSpec, TargetId};

use crate::directory::DirectoryModel;
use crate::dry_run::DryRunMutator;
use crate::error::{MemberError, NormalizeError, SyncResult};
use crate::model::{is_under, normalize_key, MemberRef, SourceGroup, TargetGroup};
use crate::report::{CreatedUser, GroupOutcome, SkipReason, SyncReport};
use crate::resolver::{IdentityResolver, Resolution};
use crate::settings::{DirectoryLayout, SyncSettings};
use crate::snapshot::TargetSnapshot;

/// Reconciles directory groups into the target.
pub struct SyncEngine {
    directory: Arc<dyn DirectoryReader>,
    target: Arc<dyn TargetReader>,
    mutator: Arc<dyn TargetMutator>,
    layout: DirectoryLayout,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        directory: Arc<dyn DirectoryReader>,
        target: Arc<dyn TargetReader>,
        mutator: Arc<dyn TargetMutator>,
        layout: DirectoryLayout,
        settings: SyncSettings,
    ) -> Self {
        Self {
            directory,
            target,
            mutator,
            layout,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Execute one run.
    ///
    /// Fails only when the run cannot start: bad settings, a failed directory
    /// group search or an incomplete target snapshot. Nothing is written to
    /// the target in those cases. Everything else ends up in the report.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        self.settings.validate()?;
        self.layout.validate()?;

        let timeout = CallTimeout::new(self.settings.call_timeout());
        let dry_run = self.settings.dry_run.then(DryRunMutator::new);
        let mutator: &dyn TargetMutator = match &dry_run {
            Some(recorder) => recorder,
            None => self.mutator.as_ref(),
        };

        let mut report = SyncReport::start(self.settings.dry_run);
        info!(
            directory = %self.directory.display_name(),
            target = %self.target.display_name(),
            dry_run = self.settings.dry_run,
            prune = self.settings.prune,
            create_users = self.settings.create_users,
            "Starting sync run"
        );

        let directory = DirectoryModel::new(self.directory.as_ref(), &self.layout, timeout);
        let entries = directory.list_group_entries().await?;

        let snapshot = TargetSnapshot::build(
            self.target.as_ref(),
            &self.settings.ldap_provider,
            CallTimeout::new(self.settings.snapshot_timeout()),
        )
        .await?;

        let resolver = IdentityResolver::new(
            snapshot,
            self.directory.as_ref(),
            mutator,
            &self.layout,
            self.settings.ldap_provider.clone(),
            timeout,
        );

        let group_create_lock = Mutex::new(());
        let pass = GroupPass {
            directory: &directory,
            resolver: &resolver,
            group_create_lock: &group_create_lock,
            mutator,
            layout: &self.layout,
            settings: &self.settings,
            timeout,
        };

        // `buffered` keeps results in directory order regardless of completion order.
        let outcomes: Vec<GroupOutcome> = stream::iter(entries.iter())
            .map(|entry| pass.process(entry))
            .buffered(self.settings.group_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }
        if let Some(recorder) = &dry_run {
            report.planned_actions = recorder.actions().await;
        }
        report.finish();

        info!(
            summary = %report,
            duration_ms = report.duration_ms().unwrap_or_default(),
            "Sync run finished"
        );
        Ok(report)
    }
}

/// Borrowed state shared by every group of one run.
struct GroupPass<'a> {
    directory: &'a DirectoryModel<'a>,
    resolver: &'a IdentityResolver<'a>,
    /// Serializes group creation so two entries with one name create it once.
    group_create_lock: &'a Mutex<()>,
    mutator: &'a dyn TargetMutator,
    layout: &'a DirectoryLayout,
    settings: &'a SyncSettings,
    timeout: CallTimeout,
}

impl GroupPass<'_> {
    #[instrument(skip_all, fields(dn = %entry.dn))]
    async fn process(&self, entry: &RawEntry) -> GroupOutcome {
        let source = match self.directory.normalize(entry).await {
            Ok(source) => source,
            Err(NormalizeError::Schema(err)) => {
                warn!(reason = %err.reason, "Skipping malformed group entry");
                return GroupOutcome::schema_skipped(err.dn, err.reason);
            }
            Err(err) => {
                let name = entry
                    .first(&self.layout.group_name_attribute)
                    .unwrap_or(entry.dn.as_str())
                    .to_string();
                warn!(group = %name, error = %err, "Group membership could not be read");
                return GroupOutcome::failed(name, err.to_string());
            }
        };

        let mut outcome = GroupOutcome::new(&source.name);

        let group = match self.ensure_group(&source, &mut outcome).await {
            Ok(group) => group,
            Err(reason) => {
                outcome.failure = Some(reason);
                return outcome;
            }
        };

        self.add_missing_members(&source, &group, &mut outcome).await;

        if self.settings.prune {
            self.prune_members(&source, &mut outcome).await;
        }

        debug!(
            group = %source.name,
            added = outcome.members_added.len(),
            removed = outcome.members_removed.len(),
            skipped = outcome.members_skipped.len(),
            failed = outcome.members_failed.len() + outcome.users_failed.len(),
            "Group done"
        );
        outcome
    }

    /// Matching target group, created if missing. `Err` carries the reason
    /// the group must be abandoned.
    async fn ensure_group(
        &self,
        source: &SourceGroup,
        outcome: &mut GroupOutcome,
    ) -> Result<TargetGroup, String> {
        if let Some(group) = self.snapshot_group(&source.name).await {
            return Ok(group);
        }

        let _guard = self.group_create_lock.lock().await;
        // Another entry with the same name may have created it while we waited.
        if let Some(group) = self.snapshot_group(&source.name).await {
            debug!(group = %source.name, "Group created earlier in this run");
            return Ok(group);
        }

        let description = (self.settings.add_description && !source.description.is_empty())
            .then(|| source.description.clone());
        let spec = GroupSpec {
            name: source.name.clone(),
            path: source.name.clone(),
            visibility: self.settings.group_visibility,
            description,
        };

        match self
            .timeout
            .run("create_group", self.mutator.create_group(&spec))
            .await
        {
            Ok(id) => {
                info!(group = %source.name, group_id = id, "Created target group");
                let group = TargetGroup::empty(id, &source.name);
                self.resolver
                    .snapshot()
                    .write()
                    .await
                    .insert_group(group.clone());
                outcome.created = true;
                Ok(group)
            }
            Err(err) => {
                warn!(group = %source.name, error = %err, "Group creation failed");
                Err(format!("group creation failed: {err}"))
            }
        }
    }

    async fn snapshot_group(&self, name: &str) -> Option<TargetGroup> {
        self.resolver.snapshot().read().await.group(name).cloned()
    }

    /// Additive pass: every directory member ends up in the target group.
    async fn add_missing_members(
        &self,
        source: &SourceGroup,
        group: &TargetGroup,
        outcome: &mut GroupOutcome,
    ) {
        for member in &source.members {
            let Some(user_id) = self.user_for(member, outcome).await else {
                continue;
            };

            // Present before the run: nothing to do.
            if group.has_member(user_id) {
                continue;
            }

            let already_added = self
                .resolver
                .snapshot()
                .read()
                .await
                .group(&source.name)
                .is_some_and(|g| g.has_member(user_id));
            if already_added {
                debug!(member = %member, user_id, "Account already added to group");
                outcome.skip(member.as_str(), SkipReason::AlreadyMember);
                continue;
            }

            match self
                .timeout
                .run(
                    "add_member",
                    self.mutator
                        .add_member(group.id, user_id, self.settings.access_level),
                )
                .await
            {
                Ok(()) => {
                    info!(member = %member, user_id, "Added member");
                    self.resolver
                        .snapshot()
                        .write()
                        .await
                        .add_membership(&source.name, user_id);
                    outcome.added(member.as_str(), user_id);
                }
                Err(err) if err.conflict_kind() == Some(ConflictKind::Membership) => {
                    debug!(member = %member, user_id, "Target reports existing membership");
                    self.resolver
                        .snapshot()
                        .write()
                        .await
                        .add_membership(&source.name, user_id);
                    outcome.skip(member.as_str(), SkipReason::AlreadyMember);
                }
                Err(cause) => {
                    let err = MemberError::AddMember {
                        member: member.to_string(),
                        source: cause,
                    };
                    warn!(error = %err, "Member add failed");
                    outcome.member_failed(member.as_str(), err.to_string());
                }
            }
        }
    }

    /// Account id for `member`, or `None` after recording why there is none.
    async fn user_for(&self, member: &MemberRef, outcome: &mut GroupOutcome) -> Option<TargetId> {
        if !self.settings.create_users {
            return match self.resolver.resolve(member).await {
                Some(user) => Some(user.id),
                None => {
                    warn!(member = %member, "No linked account and user creation is disabled");
                    outcome.skip(member.as_str(), SkipReason::NoLinkedAccount);
                    None
                }
            };
        }

        match self.resolver.resolve_or_create(member).await {
            Ok(Resolution::Existing(user)) => Some(user.id),
            Ok(Resolution::Created {
                user,
                email_adjusted,
            }) => {
                outcome.users_created.push(CreatedUser {
                    member: member.to_string(),
                    user_id: user.id,
                    username: user.username,
                    email: user.email,
                    email_adjusted,
                });
                Some(user.id)
            }
            Err(err) => {
                warn!(error = %err, "Member could not be resolved to an account");
                if err.is_user_create() {
                    outcome.user_failed(member.as_str(), err.to_string());
                } else {
                    outcome.member_failed(member.as_str(), err.to_string());
                }
                None
            }
        }
    }

    /// Remove target members that are managed directory users but no longer
    /// in the directory group.
    async fn prune_members(&self, source: &SourceGroup, outcome: &mut GroupOutcome) {
        let source_keys: HashSet<String> = source.members.iter().map(MemberRef::key).collect();
        let users_base = normalize_key(&self.layout.users_base_dn);

        let candidates = {
            let snapshot = self.resolver.snapshot().read().await;
            let Some(group) = snapshot.group(&source.name) else {
                return;
            };
            let mut candidates = Vec::new();
            for &user_id in &group.members {
                let managed = snapshot.user(user_id).and_then(|user| {
                    user.external_identity
                        .as_ref()
                        .filter(|identity| is_under(&identity.key(), &users_base))
                        .map(|identity| (user.username.clone(), identity.key()))
                });
                match managed {
                    Some((username, key)) if !source_keys.contains(&key) => {
                        candidates.push((group.id, user_id, username));
                    }
                    Some(_) => {}
                    None => {
                        let label = snapshot
                            .user(user_id)
                            .map(|u| u.username.clone())
                            .unwrap_or_else(|| user_id.to_string());
                        debug!(member = %label, "Not a directory user, left in place");
                        outcome.skip(label, SkipReason::NotDirectoryUser);
                    }
                }
            }
            candidates
        };

        for (group_id, user_id, username) in candidates {
            match self
                .timeout
                .run("remove_member", self.mutator.remove_member(group_id, user_id))
                .await
            {
                Ok(()) => {
                    info!(member = %username, user_id, "Removed member");
                    self.resolver
                        .snapshot()
                        .write()
                        .await
                        .remove_membership(&source.name, user_id);
                    outcome.removed(username, user_id);
                }
                Err(cause) => {
                    let err = MemberError::RemoveMember {
                        member: username.clone(),
                        source: cause,
                    };
                    warn!(error = %err, "Member removal failed");
                    outcome.member_failed(username, err.to_string());
                }
            }
        }
    }
}
