//! Destinations for where expressions.

use std::collections::BTreeMap;

use crate::error::FilterError;
use crate::expression::WhereExpression;
use crate::predicate::{Params, Predicate};

/// Receives where expressions from filters.
///
/// `group` selects the where group: expressions in one group combine with
/// OR, distinct groups combine with AND.
pub trait WhereSink {
    fn add_where_expression(&mut self, group: u32, expression: WhereExpression);
}

/// Collects expressions by group and folds them into one expression.
#[derive(Debug, Clone, Default)]
pub struct WhereGroups {
    groups: BTreeMap<u32, Vec<WhereExpression>>,
}

impl WhereGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Expressions added to `group`, in insertion order.
    pub fn group(&self, group: u32) -> &[WhereExpression] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Combine everything collected. `None` when nothing was added.
    pub fn render(&self) -> Result<Option<WhereExpression>, FilterError> {
        if self.groups.is_empty() {
            return Ok(None);
        }

        let mut params = Params::new();
        let mut conjuncts = Vec::with_capacity(self.groups.len());
        for expressions in self.groups.values() {
            let mut disjuncts = Vec::with_capacity(expressions.len());
            for expression in expressions {
                params.merge(&expression.params)?;
                disjuncts.push(expression.predicate.clone());
            }
            conjuncts.push(Predicate::Or(disjuncts));
        }

        Ok(Some(WhereExpression::new(Predicate::And(conjuncts), params)))
    }
}

impl WhereSink for WhereGroups {
    fn add_where_expression(&mut self, group: u32, expression: WhereExpression) {
        tracing::trace!(group, template = %expression.template(), "where expression added");
        self.groups.entry(group).or_default().push(expression);
    }
}
