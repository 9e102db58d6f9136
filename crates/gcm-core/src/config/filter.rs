//! Settings of the unpublished-visibility filter.
//!
//! Defaults match the usual group/node table layout, so an empty YAML
//! document is a valid configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use super::ConfigError;

static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Configuration for the unpublished-visibility filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Name of the argument binding that carries the group id.
    #[serde(default = "default_argument_name")]
    pub argument_name: String,

    /// Plugin id a binding must have to be accepted as a group id.
    #[serde(default = "default_group_argument_plugin")]
    pub group_argument_plugin: String,

    /// Entity type of the content items being filtered.
    #[serde(default = "default_content_entity_type")]
    pub content_entity_type: String,

    /// Relation plugin used in permission names (`view unpublished <plugin>:<bundle> entity`).
    #[serde(default = "default_relation_plugin")]
    pub relation_plugin: String,

    /// Prefix of the stored subtype tag; rows carry `<prefix>-<bundle>`.
    #[serde(default = "default_subtype_tag_prefix")]
    pub subtype_tag_prefix: String,

    /// Table (alias) holding the row owner.
    #[serde(default = "default_revision_table")]
    pub revision_table: String,

    /// Column holding the owner's user id.
    #[serde(default = "default_owner_column")]
    pub owner_column: String,

    /// Table (alias) holding the relationship subtype tag.
    #[serde(default = "default_relationship_table")]
    pub relationship_table: String,

    /// Column holding the subtype tag.
    #[serde(default = "default_subtype_column")]
    pub subtype_column: String,

    /// When set, both unpublished permissions additionally require
    /// `latest_version_permission` on the group.
    #[serde(default = "default_true")]
    pub require_latest_version: bool,

    #[serde(default = "default_latest_version_permission")]
    pub latest_version_permission: String,

    /// Site-wide permission that makes every row visible.
    #[serde(default = "default_bypass_permission")]
    pub bypass_permission: String,

    /// Where-clause group the expression is added to.
    #[serde(default)]
    pub where_group: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            argument_name: default_argument_name(),
            group_argument_plugin: default_group_argument_plugin(),
            content_entity_type: default_content_entity_type(),
            relation_plugin: default_relation_plugin(),
            subtype_tag_prefix: default_subtype_tag_prefix(),
            revision_table: default_revision_table(),
            owner_column: default_owner_column(),
            relationship_table: default_relationship_table(),
            subtype_column: default_subtype_column(),
            require_latest_version: true,
            latest_version_permission: default_latest_version_permission(),
            bypass_permission: default_bypass_permission(),
            where_group: 0,
        }
    }
}

impl FilterConfig {
    /// Load filter configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse filter configuration from YAML content and validate it.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that names are present and table/column names are plain SQL
    /// identifiers, since they end up in the expression text.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("argument_name", &self.argument_name),
            ("group_argument_plugin", &self.group_argument_plugin),
            ("content_entity_type", &self.content_entity_type),
            ("relation_plugin", &self.relation_plugin),
            ("subtype_tag_prefix", &self.subtype_tag_prefix),
            ("latest_version_permission", &self.latest_version_permission),
            ("bypass_permission", &self.bypass_permission),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Config(format!("`{}` must not be empty", field)));
            }
        }

        let identifiers = [
            ("revision_table", &self.revision_table),
            ("owner_column", &self.owner_column),
            ("relationship_table", &self.relationship_table),
            ("subtype_column", &self.subtype_column),
        ];
        for (field, value) in identifiers {
            if !SQL_IDENTIFIER.is_match(value) {
                return Err(ConfigError::Config(format!(
                    "`{}` must be a plain SQL identifier, got '{}'",
                    field, value
                )));
            }
        }

        Ok(())
    }

    /// Group permission to see one's own unpublished items of `subtype`.
    pub fn own_unpublished_permission(&self, subtype: &str) -> String {
        format!(
            "view own unpublished {}:{} entity",
            self.relation_plugin, subtype
        )
    }

    /// Group permission to see every unpublished item of `subtype`.
    pub fn any_unpublished_permission(&self, subtype: &str) -> String {
        format!("view unpublished {}:{} entity", self.relation_plugin, subtype)
    }

    /// Value stored in the subtype column for rows of `subtype`.
    pub fn subtype_tag(&self, subtype: &str) -> String {
        format!("{}-{}", self.subtype_tag_prefix, subtype)
    }
}

// Default value functions
fn default_argument_name() -> String {
    "gid".to_string()
}

fn default_group_argument_plugin() -> String {
    "group_id".to_string()
}

fn default_content_entity_type() -> String {
    "node".to_string()
}

fn default_relation_plugin() -> String {
    "group_node".to_string()
}

fn default_subtype_tag_prefix() -> String {
    "group-group_node".to_string()
}

fn default_revision_table() -> String {
    "node_field_revision".to_string()
}

fn default_owner_column() -> String {
    "uid".to_string()
}

fn default_relationship_table() -> String {
    "group_relationship_field_data_node_field_data".to_string()
}

fn default_subtype_column() -> String {
    "type".to_string()
}

fn default_latest_version_permission() -> String {
    "view latest version".to_string()
}

fn default_bypass_permission() -> String {
    "bypass node access".to_string()
}

fn default_true() -> bool {
    true
}
