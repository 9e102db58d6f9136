//! Unpublished-content visibility filter for group views.

use std::collections::HashSet;
use std::sync::Arc;

use gcm_core::{
    Account, FilterConfig, Group, GroupId, GroupStorage, RelationTypeRegistry, ViewArguments,
};
use thiserror::Error;

use crate::expression::WhereExpression;
use crate::predicate::{ColumnRef, Operand, Params, Predicate};
use crate::sink::WhereSink;

const CURRENT_USER: &str = "current_user";
const BYPASS: &str = "bypass_node_access";

/// Why every row was hidden.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockReason {
    #[error("no `{argument}` argument is bound to the view")]
    MissingArgument { argument: String },

    #[error("argument `{argument}` is handled by `{plugin_id}`, expected `{expected}`")]
    WrongArgumentKind {
        argument: String,
        plugin_id: String,
        expected: String,
    },

    #[error("no usable group id at argument position {position}")]
    MissingGroupId { position: usize },

    #[error("group {0} does not exist")]
    GroupNotFound(GroupId),

    #[error("loading group {group} failed: {message}")]
    GroupLookupFailed { group: GroupId, message: String },

    #[error("relation definitions for group {group} are unavailable: {message}")]
    RegistryUnavailable { group: GroupId, message: String },
}

/// Result of evaluating the filter for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Hide every row (`1 != 1`).
    BlockAll(BlockReason),
    /// The group holds no content subtypes; add nothing.
    NoOp,
    /// Restrict rows with this expression.
    Restrict(WhereExpression),
}

impl FilterOutcome {
    /// The expression to attach, if any.
    pub fn expression(&self) -> Option<WhereExpression> {
        match self {
            FilterOutcome::BlockAll(_) => Some(WhereExpression::block_all()),
            FilterOutcome::NoOp => None,
            FilterOutcome::Restrict(expression) => Some(expression.clone()),
        }
    }

    pub fn is_block_all(&self) -> bool {
        matches!(self, FilterOutcome::BlockAll(_))
    }
}

/// Group permissions of the current user for one content subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypePermissions {
    pub subtype: String,
    pub view_own_unpublished: bool,
    pub view_any_unpublished: bool,
}

/// Restricts group content so unpublished items are only visible with the
/// matching "own" or "any" unpublished permission of their subtype.
///
/// The filter is stateless; collaborators are only read.
#[derive(Clone)]
pub struct UnpublishedVisibilityFilter {
    config: FilterConfig,
    groups: Arc<dyn GroupStorage>,
    relations: Arc<dyn RelationTypeRegistry>,
}

impl UnpublishedVisibilityFilter {
    pub fn new(
        config: FilterConfig,
        groups: Arc<dyn GroupStorage>,
        relations: Arc<dyn RelationTypeRegistry>,
    ) -> Self {
        Self {
            config,
            groups,
            relations,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Column holding the row owner.
    pub fn owner_column(&self) -> ColumnRef {
        ColumnRef::new(&self.config.revision_table, &self.config.owner_column)
    }

    /// Column holding the `<prefix>-<subtype>` tag.
    pub fn subtype_column(&self) -> ColumnRef {
        ColumnRef::new(&self.config.relationship_table, &self.config.subtype_column)
    }

    /// Evaluate the filter and hand the resulting expression to `sink`.
    pub fn apply(
        &self,
        arguments: &ViewArguments,
        user: &dyn Account,
        sink: &mut dyn WhereSink,
    ) -> FilterOutcome {
        let outcome = self.build_predicate(arguments, user);
        if let Some(expression) = outcome.expression() {
            sink.add_where_expression(self.config.where_group, expression);
        }
        outcome
    }

    /// Decide what the current request may see.
    pub fn build_predicate(&self, arguments: &ViewArguments, user: &dyn Account) -> FilterOutcome {
        let group_id = match self.resolve_group_id(arguments) {
            Ok(id) => id,
            Err(reason) => return block(reason),
        };

        let group = match self.groups.load(group_id) {
            Ok(Some(group)) => group,
            Ok(None) => return block(BlockReason::GroupNotFound(group_id)),
            Err(err) => {
                tracing::warn!(group_id = %group_id, error = %err, "group lookup failed");
                return block(BlockReason::GroupLookupFailed {
                    group: group_id,
                    message: err.to_string(),
                });
            }
        };

        let subtypes = match self.content_subtypes(group_id) {
            Ok(subtypes) => subtypes,
            Err(reason) => return block(reason),
        };

        if subtypes.is_empty() {
            tracing::debug!(group_id = %group_id, "group has no content subtypes, no filtering");
            return FilterOutcome::NoOp;
        }

        let permissions: Vec<SubtypePermissions> = subtypes
            .iter()
            .map(|subtype| self.subtype_permissions(group.as_ref(), subtype, user))
            .collect();

        tracing::debug!(
            group_id = %group_id,
            user_id = %user.id(),
            subtypes = permissions.len(),
            "restricting unpublished group content"
        );

        FilterOutcome::Restrict(self.visibility_expression(&permissions, user))
    }

    /// Resolve the group id from the configured argument binding.
    pub fn resolve_group_id(&self, arguments: &ViewArguments) -> Result<GroupId, BlockReason> {
        let name = &self.config.argument_name;
        let binding = arguments
            .binding(name)
            .ok_or_else(|| BlockReason::MissingArgument {
                argument: name.clone(),
            })?;

        if binding.plugin_id != self.config.group_argument_plugin {
            return Err(BlockReason::WrongArgumentKind {
                argument: name.clone(),
                plugin_id: binding.plugin_id.clone(),
                expected: self.config.group_argument_plugin.clone(),
            });
        }

        let raw = arguments
            .positional(binding.position)
            .map(str::trim)
            .unwrap_or_default();
        match raw.parse::<u64>() {
            Ok(id) if id != 0 => Ok(GroupId(id)),
            _ => Err(BlockReason::MissingGroupId {
                position: binding.position,
            }),
        }
    }

    /// Bundles of the content entity type related to `group`, deduplicated
    /// in registry order.
    pub fn content_subtypes(&self, group: GroupId) -> Result<Vec<String>, BlockReason> {
        let definitions = self.relations.definitions(group).map_err(|err| {
            tracing::warn!(group_id = %group, error = %err, "relation registry failed");
            BlockReason::RegistryUnavailable {
                group,
                message: err.to_string(),
            }
        })?;

        let mut subtypes: Vec<String> = Vec::new();
        for definition in definitions {
            if definition.entity_type_id != self.config.content_entity_type {
                continue;
            }
            if let Some(bundle) = definition.entity_bundle {
                if !subtypes.contains(&bundle) {
                    subtypes.push(bundle);
                }
            }
        }
        Ok(subtypes)
    }

    /// Ask `group` for the user's unpublished permissions on `subtype`.
    pub fn subtype_permissions(
        &self,
        group: &dyn Group,
        subtype: &str,
        user: &dyn Account,
    ) -> SubtypePermissions {
        let latest = !self.config.require_latest_version
            || group.has_permission(&self.config.latest_version_permission, user);

        SubtypePermissions {
            subtype: subtype.to_string(),
            view_own_unpublished: latest
                && group.has_permission(&self.config.own_unpublished_permission(subtype), user),
            view_any_unpublished: latest
                && group.has_permission(&self.config.any_unpublished_permission(subtype), user),
        }
    }

    /// Build the OR of one disjunct per subtype plus the bypass flag:
    ///
    /// ```text
    /// (owner = :current_user AND :current_user <> 0 AND subtype = :subtype_x AND :own_unpublished_x)
    ///   OR (subtype = :subtype_x AND :all_unpublished_x)
    /// ```
    pub fn visibility_expression(
        &self,
        permissions: &[SubtypePermissions],
        user: &dyn Account,
    ) -> WhereExpression {
        let owner = Operand::Column(self.owner_column());
        let subtype_column = Operand::Column(self.subtype_column());

        let mut params = Params::new();
        params.bind(CURRENT_USER, user.id().0 as i64);
        params.bind(BYPASS, user.has_permission(&self.config.bypass_permission));

        let mut used_keys = HashSet::new();
        let mut disjuncts = Vec::with_capacity(permissions.len() + 1);
        for entry in permissions {
            let key = unique_key(&mut used_keys, &entry.subtype);
            let subtype_param = format!("subtype_{}", key);
            let own_param = format!("own_unpublished_{}", key);
            let all_param = format!("all_unpublished_{}", key);

            params.bind(subtype_param.as_str(), self.config.subtype_tag(&entry.subtype));
            params.bind(own_param.as_str(), entry.view_own_unpublished);
            params.bind(all_param.as_str(), entry.view_any_unpublished);

            let is_subtype = Predicate::eq(subtype_column.clone(), Operand::param(&subtype_param));
            disjuncts.push(Predicate::Or(vec![
                Predicate::And(vec![
                    Predicate::eq(owner.clone(), Operand::param(CURRENT_USER)),
                    Predicate::not_eq(Operand::param(CURRENT_USER), Operand::Int(0)),
                    is_subtype.clone(),
                    Predicate::flag(own_param),
                ]),
                Predicate::And(vec![is_subtype, Predicate::flag(all_param)]),
            ]));
        }
        disjuncts.push(Predicate::flag(BYPASS));

        WhereExpression::new(Predicate::Or(disjuncts), params)
    }
}

fn block(reason: BlockReason) -> FilterOutcome {
    tracing::debug!(reason = %reason, "hiding all group content");
    FilterOutcome::BlockAll(reason)
}

/// Placeholder-safe key for `subtype`: lowercase ASCII alphanumerics and
/// underscores, suffixed when two subtypes collapse to the same key.
fn unique_key(used: &mut HashSet<String>, subtype: &str) -> String {
    let base: String = subtype
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let base = if base.is_empty() { "subtype".to_string() } else { base };

    let mut key = base.clone();
    let mut n = 2;
    while !used.insert(key.clone()) {
        key = format!("{}_{}", base, n);
        n += 1;
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcm_core::{
        ArgumentBinding, MemoryGroup, MemoryGroupStorage, RelationDefinition,
        StaticRelationRegistry, UserAccount, UserId,
    };
    use pretty_assertions::assert_eq;

    fn filter_with(storage: MemoryGroupStorage, registry: StaticRelationRegistry) -> UnpublishedVisibilityFilter {
        UnpublishedVisibilityFilter::new(
            FilterConfig::default(),
            Arc::new(storage),
            Arc::new(registry),
        )
    }

    fn gid_args(value: &str) -> ViewArguments {
        ViewArguments::new()
            .with_binding("gid", ArgumentBinding::new("group_id", 0))
            .with_args([value])
    }

    fn node(bundle: &str) -> RelationDefinition {
        RelationDefinition::new(format!("group_node:{}", bundle), "node", Some(bundle))
    }

    #[test]
    fn test_resolve_group_id() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        assert_eq!(filter.resolve_group_id(&gid_args("5")), Ok(GroupId(5)));
        assert_eq!(filter.resolve_group_id(&gid_args(" 12 ")), Ok(GroupId(12)));
    }

    #[test]
    fn test_zero_empty_and_garbage_ids_rejected() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        for raw in ["0", "", "abc", "-3"] {
            assert_eq!(
                filter.resolve_group_id(&gid_args(raw)),
                Err(BlockReason::MissingGroupId { position: 0 }),
                "raw id {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_position_out_of_range() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        let args = ViewArguments::new().with_binding("gid", ArgumentBinding::new("group_id", 2));
        assert_eq!(
            filter.resolve_group_id(&args),
            Err(BlockReason::MissingGroupId { position: 2 })
        );
    }

    #[test]
    fn test_wrong_argument_kind() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        let args = ViewArguments::new()
            .with_binding("gid", ArgumentBinding::new("numeric", 0))
            .with_args(["5"]);
        let outcome = filter.build_predicate(&args, &UserAccount::new(UserId(1)));
        assert!(matches!(
            outcome,
            FilterOutcome::BlockAll(BlockReason::WrongArgumentKind { ref plugin_id, .. }) if plugin_id == "numeric"
        ));
    }

    #[test]
    fn test_content_subtypes_filters_and_dedupes() {
        let registry = StaticRelationRegistry::new(vec![
            node("article"),
            RelationDefinition::new("group_membership", "user", None),
            node("page"),
            RelationDefinition::new("group_node:article", "node", Some("article")),
            RelationDefinition::new("group_node", "node", None),
        ]);
        let filter = filter_with(MemoryGroupStorage::new(), registry);
        assert_eq!(
            filter.content_subtypes(GroupId(1)).unwrap(),
            vec!["article".to_string(), "page".to_string()]
        );
    }

    #[test]
    fn test_latest_version_gate() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        let user = UserAccount::new(UserId(42));
        let without_latest = MemoryGroup::new(GroupId(5))
            .with_member(UserId(42), ["view unpublished group_node:article entity"]);
        let with_latest = MemoryGroup::new(GroupId(5)).with_member(
            UserId(42),
            ["view unpublished group_node:article entity", "view latest version"],
        );

        let gated = filter.subtype_permissions(&without_latest, "article", &user);
        assert!(!gated.view_any_unpublished);
        let granted = filter.subtype_permissions(&with_latest, "article", &user);
        assert!(granted.view_any_unpublished);
        assert!(!granted.view_own_unpublished);
    }

    #[test]
    fn test_latest_version_gate_disabled() {
        let config = FilterConfig {
            require_latest_version: false,
            ..FilterConfig::default()
        };
        let filter = UnpublishedVisibilityFilter::new(
            config,
            Arc::new(MemoryGroupStorage::new()),
            Arc::new(StaticRelationRegistry::default()),
        );
        let group = MemoryGroup::new(GroupId(5))
            .with_member(UserId(42), ["view own unpublished group_node:page entity"]);
        let permissions = filter.subtype_permissions(&group, "page", &UserAccount::new(UserId(42)));
        assert!(permissions.view_own_unpublished);
        assert!(!permissions.view_any_unpublished);
    }

    #[test]
    fn test_visibility_expression_template() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        let permissions = vec![SubtypePermissions {
            subtype: "article".to_string(),
            view_own_unpublished: true,
            view_any_unpublished: false,
        }];
        let expression = filter.visibility_expression(&permissions, &UserAccount::new(UserId(42)));

        assert_eq!(
            expression.template(),
            "((node_field_revision.uid = :current_user AND :current_user <> 0 \
             AND group_relationship_field_data_node_field_data.type = :subtype_article \
             AND :own_unpublished_article) \
             OR (group_relationship_field_data_node_field_data.type = :subtype_article \
             AND :all_unpublished_article)) \
             OR :bypass_node_access"
        );
        assert_eq!(
            expression.params.get("subtype_article"),
            Some(&"group-group_node-article".into())
        );
        assert_eq!(expression.params.get("current_user"), Some(&42i64.into()));
        assert_eq!(expression.params.get("bypass_node_access"), Some(&false.into()));
    }

    #[test]
    fn test_subtype_text_never_reaches_template() {
        let filter = filter_with(MemoryGroupStorage::new(), StaticRelationRegistry::default());
        let permissions = vec![SubtypePermissions {
            subtype: "x' OR '1'='1".to_string(),
            view_own_unpublished: false,
            view_any_unpublished: false,
        }];
        let expression = filter.visibility_expression(&permissions, &UserAccount::anonymous());
        assert!(!expression.template().contains('\''));
        assert_eq!(
            expression.params.get("subtype_x__or__1___1"),
            Some(&"group-group_node-x' OR '1'='1".into())
        );
    }

    #[test]
    fn test_unique_keys_for_colliding_subtypes() {
        let mut used = HashSet::new();
        assert_eq!(unique_key(&mut used, "news-item"), "news_item");
        assert_eq!(unique_key(&mut used, "news_item"), "news_item_2");
        assert_eq!(unique_key(&mut used, "News Item"), "news_item_3");
        assert_eq!(unique_key(&mut used, ""), "subtype");
    }

    #[test]
    fn test_apply_adds_to_configured_group() {
        let storage = MemoryGroupStorage::new().with_group(MemoryGroup::new(GroupId(5)));
        let registry = StaticRelationRegistry::new(vec![node("article")]);
        let config = FilterConfig {
            where_group: 3,
            ..FilterConfig::default()
        };
        let filter = UnpublishedVisibilityFilter::new(config, Arc::new(storage), Arc::new(registry));

        let mut sink = crate::sink::WhereGroups::new();
        let outcome = filter.apply(&gid_args("5"), &UserAccount::new(UserId(42)), &mut sink);

        assert!(matches!(outcome, FilterOutcome::Restrict(_)));
        assert_eq!(sink.group(3).len(), 1);
        assert!(sink.group(0).is_empty());
    }
}
