//! Error types for the filter crate.

use thiserror::Error;

/// Errors raised while rendering or attaching a where expression.
///
/// Building the visibility predicate itself never fails; see
/// [`crate::BlockReason`] for the ways it degrades instead.
#[derive(Debug, Error)]
pub enum FilterError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// The statement cannot carry a where expression.
    #[error("unsupported statement: {reason}")]
    UnsupportedStatement { reason: String },

    /// DDL statement is not allowed.
    #[error("DDL statement not allowed: {statement}")]
    DdlNotAllowed { statement: String },

    /// The expression references a placeholder without a bound value.
    #[error("placeholder :{name} has no bound value")]
    UnboundParameter { name: String },

    /// Two expressions bind the same placeholder to different values.
    #[error("placeholder :{name} is bound to conflicting values")]
    ParameterConflict { name: String },
}
