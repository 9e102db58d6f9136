//! Where expressions: a predicate together with its bound values.

use std::collections::HashMap;

use crate::error::FilterError;
use crate::predicate::{ParamValue, Params, Predicate, RowValues};

/// A predicate ready to be attached to a query's where clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereExpression {
    pub predicate: Predicate,
    pub params: Params,
}

/// The expression rendered with positional `$n` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalExpression {
    pub sql: String,
    /// Values in placeholder order; `values[0]` binds `$(offset + 1)`.
    pub values: Vec<ParamValue>,
}

impl WhereExpression {
    pub fn new(predicate: Predicate, params: Params) -> Self {
        Self { predicate, params }
    }

    /// `1 != 1`: hides every row.
    pub fn block_all() -> Self {
        Self::new(Predicate::Never, Params::new())
    }

    pub fn is_block_all(&self) -> bool {
        self.predicate == Predicate::Never
    }

    /// Template with `:name` placeholders.
    pub fn template(&self) -> String {
        self.predicate.render_named()
    }

    /// Render with `$n` placeholders numbered after `offset`, as Postgres
    /// drivers expect. Fails when a placeholder has no bound value.
    pub fn to_positional(&self, offset: usize) -> Result<PositionalExpression, FilterError> {
        let mut indices: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut sql = String::new();

        self.predicate.write_sql(&mut sql, &mut |name| {
            let index = match indices.get(name) {
                Some(index) => *index,
                None => {
                    order.push(name.to_string());
                    let index = offset + order.len();
                    indices.insert(name.to_string(), index);
                    index
                }
            };
            format!("${}", index)
        });

        let values = order
            .iter()
            .map(|name| {
                self.params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FilterError::UnboundParameter { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionalExpression { sql, values })
    }

    /// Whether `row` passes this expression.
    pub fn matches(&self, row: &RowValues) -> bool {
        self.predicate.evaluate(row, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{ColumnRef, Operand};
    use pretty_assertions::assert_eq;

    fn own_clause() -> WhereExpression {
        let mut params = Params::new();
        params.bind("current_user", 42i64);
        params.bind("own_unpublished_article", true);
        let predicate = Predicate::And(vec![
            Predicate::eq(
                Operand::Column(ColumnRef::new("node_field_revision", "uid")),
                Operand::param("current_user"),
            ),
            Predicate::not_eq(Operand::param("current_user"), Operand::Int(0)),
            Predicate::flag("own_unpublished_article"),
        ]);
        WhereExpression::new(predicate, params)
    }

    #[test]
    fn test_block_all_template() {
        let expression = WhereExpression::block_all();
        assert!(expression.is_block_all());
        assert_eq!(expression.template(), "1 != 1");
        assert!(!expression.matches(&RowValues::new()));
    }

    #[test]
    fn test_named_template() {
        assert_eq!(
            own_clause().template(),
            "node_field_revision.uid = :current_user AND :current_user <> 0 AND :own_unpublished_article"
        );
    }

    #[test]
    fn test_positional_reuses_index_for_repeated_names() {
        let positional = own_clause().to_positional(0).unwrap();
        assert_eq!(
            positional.sql,
            "node_field_revision.uid = $1 AND $1 <> 0 AND $2"
        );
        assert_eq!(
            positional.values,
            vec![ParamValue::Int(42), ParamValue::Bool(true)]
        );
    }

    #[test]
    fn test_positional_offset() {
        let positional = own_clause().to_positional(3).unwrap();
        assert!(positional.sql.starts_with("node_field_revision.uid = $4 AND $4"));
        assert!(positional.sql.ends_with("$5"));
    }

    #[test]
    fn test_unbound_placeholder_rejected() {
        let expression = WhereExpression::new(Predicate::flag("missing"), Params::new());
        let err = expression.to_positional(0).unwrap_err();
        assert!(matches!(err, FilterError::UnboundParameter { name } if name == "missing"));
    }
}
