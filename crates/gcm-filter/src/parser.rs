//! SQL parsing helpers.

use crate::error::FilterError;
use sqlparser::ast::{Expr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Parses statements and expressions in the Postgres dialect.
pub struct SqlAnalyzer {
    dialect: PostgreSqlDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, FilterError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| FilterError::ParseError(e.to_string()))
    }

    /// Parse a standalone boolean expression.
    pub fn parse_expr(&self, sql: &str) -> Result<Expr, FilterError> {
        Parser::new(&self.dialect)
            .try_with_sql(sql)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| FilterError::ParseError(e.to_string()))
    }

    /// Highest `$n` placeholder used in `sql`, or 0 when there is none.
    pub fn highest_placeholder(&self, sql: &str) -> Result<usize, FilterError> {
        let tokens = Tokenizer::new(&self.dialect, sql)
            .tokenize()
            .map_err(|e| FilterError::ParseError(e.to_string()))?;

        Ok(tokens
            .iter()
            .filter_map(|token| match token {
                Token::Placeholder(p) => p.strip_prefix('$').and_then(|n| n.parse::<usize>().ok()),
                _ => None,
            })
            .max()
            .unwrap_or(0))
    }

    /// Check if a statement is a DDL statement.
    pub fn is_ddl(&self, stmt: &Statement) -> bool {
        matches!(
            stmt,
            Statement::CreateTable { .. }
                | Statement::AlterTable { .. }
                | Statement::Drop { .. }
                | Statement::Truncate { .. }
                | Statement::CreateIndex { .. }
                | Statement::CreateView { .. }
        )
    }
}
