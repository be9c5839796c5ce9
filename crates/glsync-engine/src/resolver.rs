//! Identity resolver
//!
//! Maps a directory member to a target account through the external identity
//! only. Accounts created during the run go back into the snapshot, so later
//! references to the same identity reuse them.

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use glsync_connector::error::{ConflictKind, ConnectorError};
use glsync_connector::operation::RawEntry;
use glsync_connector::resilience::CallTimeout;
use glsync_connector::traits::{DirectoryReader, TargetMutator};
use glsync_connector::types::{TargetId, UserSpec};

use crate::error::MemberError;
use crate::model::{ExternalIdentity, MemberRef, TargetUser};
use crate::settings::DirectoryLayout;
use crate::snapshot::TargetSnapshot;

/// How a member was matched to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already linked before this call.
    Existing(TargetUser),
    /// Created from the directory entry.
    Created {
        user: TargetUser,
        /// The address was rewritten after an email conflict.
        email_adjusted: bool,
    },
}

impl Resolution {
    pub fn user(&self) -> &TargetUser {
        match self {
            Resolution::Existing(user) | Resolution::Created { user, .. } => user,
        }
    }
}

/// Per-run owner of the target snapshot and of user creation.
pub struct IdentityResolver<'a> {
    snapshot: RwLock<TargetSnapshot>,
    /// Serializes create-if-absent across concurrently processed groups.
    create_lock: Mutex<()>,
    directory: &'a dyn DirectoryReader,
    mutator: &'a dyn TargetMutator,
    layout: &'a DirectoryLayout,
    provider: String,
    timeout: CallTimeout,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        snapshot: TargetSnapshot,
        directory: &'a dyn DirectoryReader,
        mutator: &'a dyn TargetMutator,
        layout: &'a DirectoryLayout,
        provider: impl Into<String>,
        timeout: CallTimeout,
    ) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            create_lock: Mutex::new(()),
            directory,
            mutator,
            layout,
            provider: provider.into(),
            timeout,
        }
    }

    /// The run's snapshot.
    pub fn snapshot(&self) -> &RwLock<TargetSnapshot> {
        &self.snapshot
    }

    /// Linked account for `member`, by external uid only.
    pub async fn resolve(&self, member: &MemberRef) -> Option<TargetUser> {
        self.snapshot
            .read()
            .await
            .user_by_external_uid(member.as_str())
            .cloned()
    }

    /// Linked account for `member`, creating one from the directory entry if
    /// none exists.
    pub async fn resolve_or_create(&self, member: &MemberRef) -> Result<Resolution, MemberError> {
        if let Some(user) = self.resolve(member).await {
            return Ok(Resolution::Existing(user));
        }

        let _guard = self.create_lock.lock().await;

        // Another group may have created it while we waited.
        if let Some(user) = self.resolve(member).await {
            return Ok(Resolution::Existing(user));
        }

        let entry = self.read_entry(member).await?;
        let spec = self.user_spec(member, &entry)?;
        let (id, email, email_adjusted) = self.create_user(member, spec.clone()).await?;

        let user = TargetUser {
            id,
            username: spec.username,
            display_name: spec.name,
            email,
            external_identity: Some(ExternalIdentity {
                provider: spec.provider,
                uid: spec.extern_uid,
            }),
        };
        self.snapshot.write().await.insert_user(user.clone());

        info!(
            member = %member,
            user_id = user.id,
            username = %user.username,
            email_adjusted,
            "Created target user"
        );
        Ok(Resolution::Created {
            user,
            email_adjusted,
        })
    }

    async fn read_entry(&self, member: &MemberRef) -> Result<RawEntry, MemberError> {
        self.timeout
            .run(
                "directory user read",
                self.directory.get_entry(member.as_str()),
            )
            .await
            .map_err(|source| MemberError::Lookup {
                member: member.to_string(),
                source,
            })?
            .ok_or_else(|| MemberError::EntryNotFound {
                member: member.to_string(),
            })
    }

    /// Account request built from the directory entry. The external uid is the
    /// member reference exactly as read from the group.
    fn user_spec(&self, member: &MemberRef, entry: &RawEntry) -> Result<UserSpec, MemberError> {
        let username = entry
            .first_of(&self.layout.username_attributes)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MemberError::MissingAttribute {
                member: member.to_string(),
                attribute: self.layout.username_attributes.join("|"),
            })?
            .to_string();

        let name = entry
            .first_of(&self.layout.display_name_attributes)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| username.clone());

        let email = entry
            .first(&self.layout.mail_attribute)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MemberError::MissingAttribute {
                member: member.to_string(),
                attribute: self.layout.mail_attribute.clone(),
            })?
            .to_string();

        Ok(UserSpec {
            username,
            name,
            email,
            provider: self.provider.clone(),
            extern_uid: member.as_str().to_string(),
        })
    }

    /// Create the account, retrying exactly once with an adjusted address on
    /// an email conflict. Returns the id, the address used and whether it was
    /// adjusted.
    async fn create_user(
        &self,
        member: &MemberRef,
        mut spec: UserSpec,
    ) -> Result<(TargetId, String, bool), MemberError> {
        let fail = |source: ConnectorError| MemberError::UserCreate {
            member: member.to_string(),
            source,
        };

        match self
            .timeout
            .run("create_user", self.mutator.create_user(&spec))
            .await
        {
            Ok(id) => Ok((id, spec.email, false)),
            Err(err) if err.conflict_kind() == Some(ConflictKind::Email) => {
                let Some(adjusted) = adjusted_email(&spec.email, &spec.username) else {
                    return Err(fail(err));
                };
                warn!(
                    member = %member,
                    original = %spec.email,
                    adjusted = %adjusted,
                    "Email already taken, retrying with adjusted address"
                );
                spec.email = adjusted;
                let id = self
                    .timeout
                    .run("create_user", self.mutator.create_user(&spec))
                    .await
                    .map_err(fail)?;
                Ok((id, spec.email, true))
            }
            Err(err) => Err(fail(err)),
        }
    }
}

/// `local@domain` becomes `local+gl-<username>@domain`.
pub fn adjusted_email(email: &str, username: &str) -> Option<String> {
    let (local, domain) = email.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(format!("{local}+gl-{username}@{domain}"))
}
