//! Attaching a where expression to a SELECT statement.

use sqlparser::ast::{BinaryOperator, Expr, SetExpr, Statement};

use crate::error::FilterError;
use crate::expression::WhereExpression;
use crate::parser::SqlAnalyzer;
use crate::predicate::ParamValue;

/// ANDs a [`WhereExpression`] into the top-level WHERE of a SELECT.
#[derive(Clone, Default)]
pub struct StatementInjector {
    analyzer: SqlAnalyzer,
}

impl StatementInjector {
    pub fn new() -> Self {
        Self {
            analyzer: SqlAnalyzer::new(),
        }
    }

    /// Inject `expression` into `sql`.
    ///
    /// Existing conditions are kept in parentheses so their ORs cannot
    /// escape the filter. Placeholders are numbered after the highest `$n`
    /// already in `sql`; the returned `parameters` bind those new ones.
    pub fn inject(
        &self,
        sql: &str,
        expression: &WhereExpression,
    ) -> Result<InjectionResult, FilterError> {
        let mut statements = self.analyzer.parse(sql)?;
        if statements.len() != 1 {
            return Err(FilterError::UnsupportedStatement {
                reason: format!("expected exactly one statement, found {}", statements.len()),
            });
        }
        let mut stmt = statements.remove(0);

        if self.analyzer.is_ddl(&stmt) {
            return Err(FilterError::DdlNotAllowed {
                statement: sql.to_string(),
            });
        }

        let placeholder_offset = self.analyzer.highest_placeholder(sql)?;
        let positional = expression.to_positional(placeholder_offset)?;
        let condition = self.analyzer.parse_expr(&positional.sql)?;

        let Statement::Query(query) = &mut stmt else {
            return Err(FilterError::UnsupportedStatement {
                reason: "only SELECT statements can be filtered".to_string(),
            });
        };
        let SetExpr::Select(select) = &mut *query.body else {
            return Err(FilterError::UnsupportedStatement {
                reason: "set operations and VALUES cannot be filtered".to_string(),
            });
        };

        select.selection = Some(match select.selection.take() {
            Some(existing) => Expr::BinaryOp {
                left: Box::new(Expr::Nested(Box::new(existing))),
                op: BinaryOperator::And,
                right: Box::new(Expr::Nested(Box::new(condition))),
            },
            None => condition,
        });

        let rewritten_sql = stmt.to_string();
        tracing::debug!(
            rewritten = %rewritten_sql,
            parameters = positional.values.len(),
            "where expression injected"
        );

        Ok(InjectionResult {
            original_sql: sql.to_string(),
            rewritten_sql,
            placeholder_offset,
            parameters: positional.values,
        })
    }
}

/// Result of injecting a where expression.
#[derive(Debug, Clone)]
pub struct InjectionResult {
    /// The original SQL statement.
    pub original_sql: String,
    /// The rewritten SQL.
    pub rewritten_sql: String,
    /// Number of `$n` placeholders the original statement already used.
    pub placeholder_offset: usize,
    /// Values for the added placeholders, starting at `$(placeholder_offset + 1)`.
    pub parameters: Vec<ParamValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{ColumnRef, Operand, Params, Predicate};

    fn owner_flag() -> WhereExpression {
        let mut params = Params::new();
        params.bind("current_user", 42i64);
        params.bind("bypass_node_access", false);
        WhereExpression::new(
            Predicate::Or(vec![
                Predicate::eq(
                    Operand::Column(ColumnRef::new("nfr", "uid")),
                    Operand::param("current_user"),
                ),
                Predicate::flag("bypass_node_access"),
            ]),
            params,
        )
    }

    #[test]
    fn test_block_all_added_without_where() {
        let injector = StatementInjector::new();
        let result = injector
            .inject("SELECT * FROM node_field_data", &WhereExpression::block_all())
            .unwrap();

        assert_eq!(result.rewritten_sql, "SELECT * FROM node_field_data WHERE 1 <> 1");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_existing_where_is_parenthesised() {
        let injector = StatementInjector::new();
        let result = injector
            .inject(
                "SELECT * FROM nfr WHERE status = 1 OR promote = 1",
                &owner_flag(),
            )
            .unwrap();

        assert_eq!(
            result.rewritten_sql,
            "SELECT * FROM nfr WHERE (status = 1 OR promote = 1) AND (nfr.uid = $1 OR $2)"
        );
        assert_eq!(
            result.parameters,
            vec![ParamValue::Int(42), ParamValue::Bool(false)]
        );
    }

    #[test]
    fn test_placeholders_follow_existing_ones() {
        let injector = StatementInjector::new();
        let result = injector
            .inject("SELECT * FROM nfr WHERE langcode = $1", &owner_flag())
            .unwrap();

        assert_eq!(result.placeholder_offset, 1);
        assert!(result.rewritten_sql.ends_with("AND (nfr.uid = $2 OR $3)"));
    }

    #[test]
    fn test_ddl_rejected() {
        let injector = StatementInjector::new();
        let result = injector.inject("DROP TABLE node_field_data", &owner_flag());
        assert!(matches!(result, Err(FilterError::DdlNotAllowed { .. })));
    }

    #[test]
    fn test_non_select_rejected() {
        let injector = StatementInjector::new();
        let result = injector.inject("DELETE FROM nfr WHERE nid = 1", &owner_flag());
        assert!(matches!(result, Err(FilterError::UnsupportedStatement { .. })));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let injector = StatementInjector::new();
        let result = injector.inject("SELECT 1; SELECT 2", &owner_flag());
        assert!(matches!(result, Err(FilterError::UnsupportedStatement { .. })));
    }
}
