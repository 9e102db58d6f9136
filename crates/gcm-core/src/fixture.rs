//! In-memory collaborators loadable from a YAML fixture.
//!
//! Used by the CLI and by tests in place of real group storage and a real
//! relation registry.
//!
//! ```yaml
//! groups:
//!   - id: 5
//!     members:
//!       - user: 42
//!         permissions: ["view own unpublished group_node:article entity", "view latest version"]
//!     relations:
//!       - { plugin_id: "group_node:article", entity_type_id: node, entity_bundle: article }
//! users:
//!   - id: 42
//! rows:
//!   - { id: 1, owner: 42, subtype: article }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::{
    Account, Group, GroupId, GroupStorage, RelationDefinition, RelationTypeRegistry, UserAccount,
    UserId,
};

/// Everything a fixture file can describe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub groups: Vec<GroupFixture>,

    /// Relations available to every group.
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,

    #[serde(default)]
    pub users: Vec<UserAccount>,

    /// Candidate content rows for visibility checks.
    #[serde(default)]
    pub rows: Vec<ContentRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFixture {
    pub id: GroupId,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub members: Vec<MemberFixture>,

    /// Permissions of users that are not members, anonymous included.
    #[serde(default)]
    pub outsider_permissions: BTreeSet<String>,

    /// Relations installed on this group only.
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberFixture {
    pub user: UserId,

    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

/// A content item as the view query would return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRow {
    pub id: u64,
    pub owner: UserId,
    pub subtype: String,

    #[serde(default)]
    pub title: Option<String>,
}

impl Fixture {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Group storage backed by the fixture's groups.
    pub fn group_storage(&self) -> MemoryGroupStorage {
        let mut storage = MemoryGroupStorage::new();
        for group in &self.groups {
            storage.insert(MemoryGroup::from(group));
        }
        storage
    }

    /// Registry returning the global relations plus each group's own.
    pub fn relation_registry(&self) -> StaticRelationRegistry {
        let mut registry = StaticRelationRegistry::new(self.relations.clone());
        for group in &self.groups {
            for relation in &group.relations {
                registry.install(group.id, relation.clone());
            }
        }
        registry
    }

    /// The user with `id`, or a permission-less account when the fixture
    /// does not list it.
    pub fn user(&self, id: UserId) -> UserAccount {
        self.users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .unwrap_or_else(|| UserAccount::new(id))
    }
}

/// A group with per-member permission sets.
#[derive(Debug, Clone)]
pub struct MemoryGroup {
    id: GroupId,
    members: HashMap<UserId, BTreeSet<String>>,
    outsider_permissions: BTreeSet<String>,
}

impl MemoryGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            members: HashMap::new(),
            outsider_permissions: BTreeSet::new(),
        }
    }

    /// Add `user` as a member holding `permissions`.
    pub fn with_member<I, S>(mut self, user: UserId, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members
            .entry(user)
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn with_outsider_permission(mut self, permission: impl Into<String>) -> Self {
        self.outsider_permissions.insert(permission.into());
        self
    }
}

impl From<&GroupFixture> for MemoryGroup {
    fn from(fixture: &GroupFixture) -> Self {
        let mut group = MemoryGroup::new(fixture.id);
        for member in &fixture.members {
            group = group.with_member(member.user, member.permissions.iter().cloned());
        }
        group.outsider_permissions = fixture.outsider_permissions.clone();
        group
    }
}

impl Group for MemoryGroup {
    fn id(&self) -> GroupId {
        self.id
    }

    fn has_permission(&self, permission: &str, account: &dyn Account) -> bool {
        // Anonymous users are never members.
        let permissions = if account.is_anonymous() {
            None
        } else {
            self.members.get(&account.id())
        };
        permissions
            .unwrap_or(&self.outsider_permissions)
            .contains(permission)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGroupStorage {
    groups: HashMap<GroupId, Arc<MemoryGroup>>,
}

impl MemoryGroupStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: MemoryGroup) {
        self.groups.insert(group.id, Arc::new(group));
    }

    pub fn with_group(mut self, group: MemoryGroup) -> Self {
        self.insert(group);
        self
    }
}

impl GroupStorage for MemoryGroupStorage {
    fn load(&self, id: GroupId) -> anyhow::Result<Option<Arc<dyn Group>>> {
        Ok(self
            .groups
            .get(&id)
            .map(|group| Arc::clone(group) as Arc<dyn Group>))
    }
}

/// Fixed relation definitions, optionally installed per group.
#[derive(Debug, Clone, Default)]
pub struct StaticRelationRegistry {
    global: Vec<RelationDefinition>,
    per_group: HashMap<GroupId, Vec<RelationDefinition>>,
}

impl StaticRelationRegistry {
    pub fn new(global: Vec<RelationDefinition>) -> Self {
        Self {
            global,
            per_group: HashMap::new(),
        }
    }

    /// Make `relation` available to `group` only.
    pub fn install(&mut self, group: GroupId, relation: RelationDefinition) {
        self.per_group.entry(group).or_default().push(relation);
    }

    pub fn with_installed(mut self, group: GroupId, relation: RelationDefinition) -> Self {
        self.install(group, relation);
        self
    }
}

impl RelationTypeRegistry for StaticRelationRegistry {
    fn definitions(&self, group: GroupId) -> anyhow::Result<Vec<RelationDefinition>> {
        let mut definitions = self.global.clone();
        if let Some(installed) = self.per_group.get(&group) {
            definitions.extend(installed.iter().cloned());
        }
        Ok(definitions)
    }
}
