//! Content relation definitions.

use serde::{Deserialize, Serialize};

use crate::GroupId;

/// A declared relation between groups and a content kind, such as
/// `group_node:article`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Relation plugin id, e.g. `group_node:article`.
    pub plugin_id: String,

    /// Entity type the relation targets, e.g. `node`.
    pub entity_type_id: String,

    /// Bundle of the targeted entity type. `None` for relations that do not
    /// distinguish bundles.
    #[serde(default)]
    pub entity_bundle: Option<String>,
}

impl RelationDefinition {
    pub fn new(
        plugin_id: impl Into<String>,
        entity_type_id: impl Into<String>,
        entity_bundle: Option<&str>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            entity_type_id: entity_type_id.into(),
            entity_bundle: entity_bundle.map(str::to_string),
        }
    }
}

/// Enumerates relation definitions.
pub trait RelationTypeRegistry: Send + Sync {
    /// Relation definitions available to `group`. Registries that do not
    /// track per-group installation return every known definition.
    fn definitions(&self, group: GroupId) -> anyhow::Result<Vec<RelationDefinition>>;
}
