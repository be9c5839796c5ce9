//! Directory side of a run: group search and normalization.
//!
//! Group entries come in three membership schemas. Each one is a variant of
//! [`GroupSchema`], and all of them normalize to the same [`SourceGroup`]
//! whose members are resolvable DNs.

use std::collections::HashSet;
use tracing::{debug, warn};

use glsync_connector::operation::{Filter, RawEntry, SearchScope};
use glsync_connector::resilience::CallTimeout;
use glsync_connector::traits::DirectoryReader;

use crate::error::{NormalizeError, SchemaError, SyncError, SyncResult};
use crate::model::{MemberRef, SourceGroup};
use crate::settings::DirectoryLayout;

/// How a group entry carries its membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupSchema {
    /// `member` holds user DNs (groupOfNames and unknown classes).
    DirectReference,
    /// `memberUid` holds bare identifiers to look up (posixGroup).
    BareIdentifier,
    /// `uniqueMember` holds DNs, kept only under the user base (groupOfUniqueNames).
    SubtreeRestricted,
}

impl GroupSchema {
    /// Select the schema from the entry's object classes.
    ///
    /// Returns `None` when the entry has no `objectClass` attribute.
    pub fn detect(entry: &RawEntry) -> Option<Self> {
        let classes = entry.values("objectClass")?;
        let has = |name: &str| classes.iter().any(|c| c.eq_ignore_ascii_case(name));

        let schema = if has("posixGroup") {
            GroupSchema::BareIdentifier
        } else if has("groupOfUniqueNames") {
            GroupSchema::SubtreeRestricted
        } else {
            GroupSchema::DirectReference
        };
        Some(schema)
    }

    /// Attribute holding the membership values.
    pub fn membership_attribute(&self) -> &'static str {
        match self {
            GroupSchema::DirectReference => "member",
            GroupSchema::BareIdentifier => "memberUid",
            GroupSchema::SubtreeRestricted => "uniqueMember",
        }
    }
}

/// Reads and normalizes directory groups for one run.
pub struct DirectoryModel<'a> {
    reader: &'a dyn DirectoryReader,
    layout: &'a DirectoryLayout,
    timeout: CallTimeout,
}

impl<'a> DirectoryModel<'a> {
    pub fn new(
        reader: &'a dyn DirectoryReader,
        layout: &'a DirectoryLayout,
        timeout: CallTimeout,
    ) -> Self {
        Self {
            reader,
            layout,
            timeout,
        }
    }

    /// `(&(|(objectClass=a)(objectClass=b))(cn=<pattern>))`
    pub fn group_search_filter(layout: &DirectoryLayout) -> Filter {
        let classes = Filter::any_object_class(layout.group_object_classes.as_slice());
        classes.and_with(Filter::matches(
            layout.group_name_attribute.clone(),
            layout.group_name_filter.clone(),
        ))
    }

    /// Filter for resolving a bare identifier to a user entry.
    pub fn user_lookup_filter(layout: &DirectoryLayout, identifier: &str) -> Filter {
        let mut filters = Vec::new();
        if !layout.user_object_classes.is_empty() {
            filters.push(Filter::any_object_class(
                layout.user_object_classes.as_slice(),
            ));
        }
        filters.push(Filter::eq(layout.user_naming_attribute.clone(), identifier));
        if let Some(extra) = layout.user_filter.as_deref().filter(|f| !f.trim().is_empty()) {
            filters.push(Filter::raw(extra));
        }
        Filter::and(filters)
    }

    /// All group entries under the groups base. Failure aborts the run.
    pub async fn list_group_entries(&self) -> SyncResult<Vec<RawEntry>> {
        let base = &self.layout.groups_base_dn;
        let filter = Self::group_search_filter(self.layout);

        let entries = self
            .timeout
            .run(
                "directory group search",
                self.reader.search(base, &filter, SearchScope::Subtree),
            )
            .await
            .map_err(|source| SyncError::Directory {
                base: base.clone(),
                source,
            })?;

        debug!(count = entries.len(), base_dn = %base, "Loaded directory groups");
        Ok(entries)
    }

    /// Normalize one group entry.
    pub async fn normalize(&self, entry: &RawEntry) -> Result<SourceGroup, NormalizeError> {
        let name_attribute = &self.layout.group_name_attribute;
        let name = entry
            .first(name_attribute)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SchemaError::new(&entry.dn, format!("missing {name_attribute} attribute"))
            })?
            .to_string();

        let schema = GroupSchema::detect(entry)
            .ok_or_else(|| SchemaError::new(&entry.dn, "missing objectClass attribute"))?;

        let description = entry
            .first(&self.layout.description_attribute)
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let values: Vec<&str> = entry
            .values(schema.membership_attribute())
            .unwrap_or_default()
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();

        let candidates: Vec<MemberRef> = match schema {
            GroupSchema::DirectReference => values.into_iter().map(MemberRef::new).collect(),
            GroupSchema::SubtreeRestricted => values
                .into_iter()
                .map(MemberRef::new)
                .filter(|member| {
                    let keep = member.is_under(&self.layout.users_base_dn);
                    if !keep {
                        debug!(
                            group = %name,
                            member = %member,
                            "Member outside user base, ignored"
                        );
                    }
                    keep
                })
                .collect(),
            GroupSchema::BareIdentifier => {
                let mut resolved = Vec::with_capacity(values.len());
                for identifier in values {
                    if let Some(dn) = self.lookup_identifier(&name, identifier).await? {
                        resolved.push(MemberRef::new(dn));
                    }
                }
                resolved
            }
        };

        let mut seen = HashSet::new();
        let members: Vec<MemberRef> = candidates
            .into_iter()
            .filter(|member| seen.insert(member.key()))
            .collect();

        Ok(SourceGroup {
            name,
            description,
            members,
        })
    }

    /// Resolve a bare identifier to exactly one DN, or drop it.
    async fn lookup_identifier(
        &self,
        group: &str,
        identifier: &str,
    ) -> Result<Option<String>, NormalizeError> {
        let filter = Self::user_lookup_filter(self.layout, identifier);
        let entries = self
            .timeout
            .run(
                "directory member lookup",
                self.reader
                    .search(&self.layout.users_base_dn, &filter, SearchScope::Subtree),
            )
            .await
            .map_err(|source| NormalizeError::Lookup {
                identifier: identifier.to_string(),
                source,
            })?;

        match entries.len() {
            1 => Ok(entries.into_iter().next().map(|entry| entry.dn)),
            0 => {
                warn!(
                    group = %group,
                    identifier = %identifier,
                    "Member identifier matched no entry, dropped"
                );
                Ok(None)
            }
            n => {
                warn!(
                    group = %group,
                    identifier = %identifier,
                    matches = n,
                    "Member identifier is ambiguous, dropped"
                );
                Ok(None)
            }
        }
    }
}
