//! # gcm-filter
//!
//! Unpublished-content visibility for group views.
//!
//! Given the `gid` argument of a view request and the current user, the
//! [`UnpublishedVisibilityFilter`] decides which rows of group content the
//! user may see:
//!
//! - rows of a subtype are visible when the user holds "view unpublished"
//!   for that subtype in the group
//! - rows the user owns are visible with "view own unpublished" (never for
//!   the anonymous user)
//! - everything is visible with the site-wide bypass permission
//!
//! ## Outcomes
//!
//! | Situation | Expression added |
//! |-----------|------------------|
//! | no `gid` binding, wrong binding kind, empty/zero id, unknown group | `1 != 1` |
//! | group has no content subtypes | nothing |
//! | otherwise | OR of one clause per subtype plus the bypass flag |
//!
//! Values are always bound through placeholders:
//!
//! ```sql
//! ((node_field_revision.uid = :current_user AND :current_user <> 0
//!     AND group_relationship_field_data_node_field_data.type = :subtype_article
//!     AND :own_unpublished_article)
//!   OR (group_relationship_field_data_node_field_data.type = :subtype_article
//!     AND :all_unpublished_article))
//! OR :bypass_node_access
//! ```

pub mod error;
pub mod expression;
pub mod filter;
pub mod injector;
pub mod parser;
pub mod predicate;
pub mod sink;

pub use error::FilterError;
pub use expression::{PositionalExpression, WhereExpression};
pub use filter::{BlockReason, FilterOutcome, SubtypePermissions, UnpublishedVisibilityFilter};
pub use injector::{InjectionResult, StatementInjector};
pub use parser::SqlAnalyzer;
pub use predicate::{ColumnRef, Operand, ParamValue, Params, Predicate, RowValues};
pub use sink::{WhereGroups, WhereSink};
