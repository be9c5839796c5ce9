//! In-memory directory and target used by the engine scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glsync_connector::error::{ConflictKind, ConnectorError, ConnectorResult};
use glsync_connector::operation::{Filter, RawEntry, SearchScope};
use glsync_connector::traits::{Connector, DirectoryReader, TargetMutator, TargetReader};
use glsync_connector::types::{
    AccessLevel, GroupSpec, RawIdentity, RawTargetGroup, RawTargetUser, TargetId, UserSpec,
};
use glsync_engine::model::normalize_key;
use glsync_engine::{DirectoryLayout, SyncEngine, SyncSettings};

pub const PROVIDER: &str = "ldapmain";
pub const GROUPS_BASE: &str = "ou=groups,dc=example,dc=com";
pub const USERS_BASE: &str = "ou=people,dc=example,dc=com";

// =============================================================================
// Directory fixtures
// =============================================================================

pub fn user_dn(uid: &str) -> String {
    format!("uid={uid},{USERS_BASE}")
}

pub fn group_dn(cn: &str) -> String {
    format!("cn={cn},{GROUPS_BASE}")
}

pub fn person(uid: &str, cn: &str, mail: &str) -> RawEntry {
    RawEntry::new(user_dn(uid))
        .with("objectClass", ["top", "inetOrgPerson", "posixAccount"])
        .with("uid", [uid])
        .with("cn", [cn])
        .with("mail", [mail])
}

pub fn group_of_names(cn: &str, description: Option<&str>, members: &[String]) -> RawEntry {
    let entry = RawEntry::new(group_dn(cn))
        .with("objectClass", ["top", "groupOfNames"])
        .with("cn", [cn])
        .with("member", members.iter().cloned());
    match description {
        Some(text) => entry.with("description", [text]),
        None => entry,
    }
}

pub fn posix_group(cn: &str, member_uids: &[&str]) -> RawEntry {
    RawEntry::new(group_dn(cn))
        .with("objectClass", ["top", "posixGroup"])
        .with("cn", [cn])
        .with("memberUid", member_uids.iter().copied())
}

pub fn unique_names_group(cn: &str, members: &[String]) -> RawEntry {
    RawEntry::new(group_dn(cn))
        .with("objectClass", ["top", "groupOfUniqueNames"])
        .with("cn", [cn])
        .with("uniqueMember", members.iter().cloned())
}

pub fn layout() -> DirectoryLayout {
    DirectoryLayout::new(GROUPS_BASE, USERS_BASE)
}

/// Settings with user creation on; everything else at its default.
pub fn settings() -> SyncSettings {
    SyncSettings {
        create_users: true,
        ..SyncSettings::default()
    }
}

pub fn engine(
    directory: &Arc<FakeDirectory>,
    target: &Arc<FakeTarget>,
    settings: SyncSettings,
) -> SyncEngine {
    SyncEngine::new(
        directory.clone(),
        target.clone(),
        target.clone(),
        layout(),
        settings,
    )
}

// =============================================================================
// FakeDirectory
// =============================================================================

/// Directory holding entries in memory and evaluating filters against them.
pub struct FakeDirectory {
    entries: Mutex<Vec<RawEntry>>,
    failing_bases: Mutex<HashSet<String>>,
    search_count: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(entries: Vec<RawEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            failing_bases: Mutex::new(HashSet::new()),
            search_count: AtomicUsize::new(0),
        }
    }

    /// Replace or add an entry by DN.
    pub fn upsert(&self, entry: RawEntry) {
        let mut entries = self.entries.lock().unwrap();
        let key = normalize_key(&entry.dn);
        entries.retain(|e| normalize_key(&e.dn) != key);
        entries.push(entry);
    }

    /// Searches rooted exactly at `base` fail with a connection error.
    pub fn fail_searches_at(&self, base: &str) {
        self.failing_bases.lock().unwrap().insert(normalize_key(base));
    }

    pub fn searches(&self) -> usize {
        self.search_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeDirectory {
    fn display_name(&self) -> &str {
        "fake directory"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DirectoryReader for FakeDirectory {
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        scope: SearchScope,
    ) -> ConnectorResult<Vec<RawEntry>> {
        self.search_count.fetch_add(1, Ordering::SeqCst);
        let base_key = normalize_key(base);
        if self.failing_bases.lock().unwrap().contains(&base_key) {
            return Err(ConnectorError::connection_failed("directory unreachable"));
        }

        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|entry| in_scope(&normalize_key(&entry.dn), &base_key, scope))
            .filter(|entry| filter_matches(filter, entry))
            .cloned()
            .collect())
    }
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    let child = dn
        .strip_suffix(base)
        .and_then(|prefix| prefix.strip_suffix(','));
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::OneLevel => child.is_some_and(|rdn| !rdn.contains(',')),
        SearchScope::Subtree => dn == base || child.is_some(),
    }
}

fn filter_matches(filter: &Filter, entry: &RawEntry) -> bool {
    match filter {
        Filter::And { filters } => filters.iter().all(|f| filter_matches(f, entry)),
        Filter::Or { filters } => filters.iter().any(|f| filter_matches(f, entry)),
        Filter::Not { filter } => !filter_matches(filter, entry),
        Filter::Equals { attribute, value } => {
            any_value(entry, attribute, |v| v.eq_ignore_ascii_case(value))
        }
        Filter::Matches { attribute, pattern } => {
            any_value(entry, attribute, |v| wildcard_match(pattern, v))
        }
        Filter::Present { attribute } => entry.has(attribute),
        Filter::Raw { .. } => true,
    }
}

fn any_value(entry: &RawEntry, attribute: &str, check: impl Fn(&str) -> bool) -> bool {
    entry
        .values(attribute)
        .is_some_and(|values| values.iter().any(|v| check(v)))
}

fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == value;
    }

    let (first, rest) = (parts[0], &parts[1..]);
    let Some(mut remaining) = value.strip_prefix(first) else {
        return false;
    };
    let (last, middle) = rest.split_last().unwrap();
    for part in middle {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

// =============================================================================
// FakeTarget
// =============================================================================

#[derive(Default)]
struct TargetState {
    groups: BTreeMap<TargetId, (String, BTreeSet<TargetId>)>,
    users: BTreeMap<TargetId, RawTargetUser>,
    next_id: TargetId,
}

impl TargetState {
    fn allocate(&mut self) -> TargetId {
        self.next_id += 1;
        self.next_id
    }
}

/// Target service in memory, counting every mutating call.
pub struct FakeTarget {
    state: Mutex<TargetState>,
    create_group_calls: AtomicUsize,
    create_user_calls: AtomicUsize,
    add_member_calls: AtomicUsize,
    remove_member_calls: AtomicUsize,
    failing_group_creates: Mutex<HashSet<String>>,
    failing_adds: Mutex<HashSet<TargetId>>,
    fail_list_users: AtomicBool,
    add_member_delay: Mutex<Option<Duration>>,
    create_user_delay: Mutex<Option<Duration>>,
    create_group_delay: Mutex<Option<Duration>>,
    list_groups_delay: Mutex<Option<Duration>>,
}

impl Default for FakeTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTarget {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TargetState {
                next_id: 100,
                ..TargetState::default()
            }),
            create_group_calls: AtomicUsize::new(0),
            create_user_calls: AtomicUsize::new(0),
            add_member_calls: AtomicUsize::new(0),
            remove_member_calls: AtomicUsize::new(0),
            failing_group_creates: Mutex::new(HashSet::new()),
            failing_adds: Mutex::new(HashSet::new()),
            fail_list_users: AtomicBool::new(false),
            add_member_delay: Mutex::new(None),
            create_user_delay: Mutex::new(None),
            create_group_delay: Mutex::new(None),
            list_groups_delay: Mutex::new(None),
        }
    }

    // --- seeding ---

    pub fn seed_group(&self, name: &str, members: &[TargetId]) -> TargetId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state
            .groups
            .insert(id, (name.to_string(), members.iter().copied().collect()));
        id
    }

    /// Seed a user, linked to `dn` under the default provider when given.
    pub fn seed_user(&self, username: &str, email: &str, dn: Option<&str>) -> TargetId {
        self.seed_user_with_identity(username, email, dn.map(|dn| (PROVIDER, dn)))
    }

    pub fn seed_user_with_identity(
        &self,
        username: &str,
        email: &str,
        identity: Option<(&str, &str)>,
    ) -> TargetId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state.users.insert(
            id,
            RawTargetUser {
                id,
                username: username.to_string(),
                name: username.to_string(),
                email: email.to_string(),
                identities: identity
                    .map(|(provider, uid)| RawIdentity {
                        provider: provider.to_string(),
                        extern_uid: uid.to_string(),
                    })
                    .into_iter()
                    .collect(),
            },
        );
        id
    }

    // --- failure injection ---

    pub fn fail_group_create(&self, name: &str) {
        self.failing_group_creates
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn fail_add_member_for(&self, user_id: TargetId) {
        self.failing_adds.lock().unwrap().insert(user_id);
    }

    pub fn fail_list_users(&self) {
        self.fail_list_users.store(true, Ordering::SeqCst);
    }

    pub fn delay_add_member(&self, delay: Duration) {
        *self.add_member_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_create_user(&self, delay: Duration) {
        *self.create_user_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_create_group(&self, delay: Duration) {
        *self.create_group_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_list_groups(&self, delay: Duration) {
        *self.list_groups_delay.lock().unwrap() = Some(delay);
    }

    // --- inspection ---

    pub fn group_id(&self, name: &str) -> Option<TargetId> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .iter()
            .find(|(_, (group_name, _))| group_name == name)
            .map(|(id, _)| *id)
    }

    pub fn members_of(&self, name: &str) -> BTreeSet<TargetId> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .values()
            .find(|(group_name, _)| group_name == name)
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }

    pub fn group_count(&self) -> usize {
        self.state.lock().unwrap().groups.len()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn user(&self, id: TargetId) -> Option<RawTargetUser> {
        self.state.lock().unwrap().users.get(&id).cloned()
    }

    pub fn user_by_extern_uid(&self, uid: &str) -> Option<RawTargetUser> {
        let state = self.state.lock().unwrap();
        state
            .users
            .values()
            .find(|user| {
                user.identities
                    .iter()
                    .any(|i| i.provider == PROVIDER && i.extern_uid == uid)
            })
            .cloned()
    }

    pub fn create_group_calls(&self) -> usize {
        self.create_group_calls.load(Ordering::SeqCst)
    }

    pub fn create_user_calls(&self) -> usize {
        self.create_user_calls.load(Ordering::SeqCst)
    }

    pub fn add_member_calls(&self) -> usize {
        self.add_member_calls.load(Ordering::SeqCst)
    }

    pub fn remove_member_calls(&self) -> usize {
        self.remove_member_calls.load(Ordering::SeqCst)
    }

    pub fn mutating_calls(&self) -> usize {
        self.create_group_calls()
            + self.create_user_calls()
            + self.add_member_calls()
            + self.remove_member_calls()
    }

    pub fn reset_calls(&self) {
        self.create_group_calls.store(0, Ordering::SeqCst);
        self.create_user_calls.store(0, Ordering::SeqCst);
        self.add_member_calls.store(0, Ordering::SeqCst);
        self.remove_member_calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for FakeTarget {
    fn display_name(&self) -> &str {
        "fake target"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TargetReader for FakeTarget {
    async fn list_groups(&self) -> ConnectorResult<Vec<RawTargetGroup>> {
        let delay = *self.list_groups_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .map(|(id, (name, members))| RawTargetGroup {
                id: *id,
                name: name.clone(),
                member_ids: members.iter().copied().collect(),
            })
            .collect())
    }

    async fn list_users(&self) -> ConnectorResult<Vec<RawTargetUser>> {
        if self.fail_list_users.load(Ordering::SeqCst) {
            return Err(ConnectorError::TargetUnavailable {
                message: "503 Service Unavailable".to_string(),
            });
        }
        Ok(self.state.lock().unwrap().users.values().cloned().collect())
    }
}

#[async_trait]
impl TargetMutator for FakeTarget {
    async fn create_group(&self, spec: &GroupSpec) -> ConnectorResult<TargetId> {
        self.create_group_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_group_creates.lock().unwrap().contains(&spec.name) {
            return Err(ConnectorError::operation_failed("group creation rejected"));
        }
        let delay = *self.create_group_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.groups.values().any(|(name, _)| name == &spec.path) {
            return Err(ConnectorError::conflict(
                ConflictKind::Path,
                "Path has already been taken",
            ));
        }
        let id = state.allocate();
        state.groups.insert(id, (spec.name.clone(), BTreeSet::new()));
        Ok(id)
    }

    async fn create_user(&self, spec: &UserSpec) -> ConnectorResult<TargetId> {
        self.create_user_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.create_user_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&spec.email))
        {
            return Err(ConnectorError::conflict(
                ConflictKind::Email,
                "Email has already been taken",
            ));
        }
        if state.users.values().any(|u| u.username == spec.username) {
            return Err(ConnectorError::conflict(
                ConflictKind::Username,
                "Username has already been taken",
            ));
        }

        let id = state.allocate();
        state.users.insert(
            id,
            RawTargetUser {
                id,
                username: spec.username.clone(),
                name: spec.name.clone(),
                email: spec.email.clone(),
                identities: vec![RawIdentity {
                    provider: spec.provider.clone(),
                    extern_uid: spec.extern_uid.clone(),
                }],
            },
        );
        Ok(id)
    }

    async fn add_member(
        &self,
        group_id: TargetId,
        user_id: TargetId,
        _access_level: AccessLevel,
    ) -> ConnectorResult<()> {
        self.add_member_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.add_member_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_adds.lock().unwrap().contains(&user_id) {
            return Err(ConnectorError::operation_failed("member add rejected"));
        }

        let mut state = self.state.lock().unwrap();
        let Some((_, members)) = state.groups.get_mut(&group_id) else {
            return Err(ConnectorError::ObjectNotFound {
                identifier: group_id.to_string(),
            });
        };
        if !members.insert(user_id) {
            return Err(ConnectorError::conflict(
                ConflictKind::Membership,
                "Member already exists",
            ));
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: TargetId, user_id: TargetId) -> ConnectorResult<()> {
        self.remove_member_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        match state
            .groups
            .get_mut(&group_id)
            .map(|(_, members)| members.remove(&user_id))
        {
            Some(true) => Ok(()),
            _ => Err(ConnectorError::ObjectNotFound {
                identifier: format!("{group_id}/{user_id}"),
            }),
        }
    }
}
