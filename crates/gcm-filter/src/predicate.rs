//! Structured boolean predicates and their bound parameters.
//!
//! A [`Predicate`] only ever refers to values through named placeholders;
//! the values live in a separate [`Params`] map. Rendering produces SQL text
//! with `:name` (or `$n`) placeholders, never literals taken from user data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::FilterError;

/// A value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Bool(b) => Some(i64::from(*b)),
            ParamValue::Int(i) => Some(*i),
            ParamValue::Text(_) => None,
        }
    }

    fn is_truthy(&self) -> bool {
        self.as_i64().is_some_and(|v| v != 0)
    }

    /// Equality with booleans and integers compared numerically, as SQL does.
    fn sql_eq(&self, other: &ParamValue) -> bool {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Placeholder name to bound value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add every binding of `other`. The same name bound to the same value
    /// twice is fine; different values are a conflict.
    pub fn merge(&mut self, other: &Params) -> Result<(), FilterError> {
        for (name, value) in &other.0 {
            match self.0.get(name) {
                Some(existing) if existing != value => {
                    return Err(FilterError::ParameterConflict { name: name.clone() });
                }
                Some(_) => {}
                None => {
                    self.0.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

/// A qualified column reference, `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(ColumnRef),
    Param(String),
    Int(i64),
}

impl Operand {
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param(name.into())
    }

    fn write_sql(&self, out: &mut String, placeholder: &mut dyn FnMut(&str) -> String) {
        match self {
            Operand::Column(column) => out.push_str(&column.to_string()),
            Operand::Param(name) => out.push_str(&placeholder(name)),
            Operand::Int(value) => out.push_str(&value.to_string()),
        }
    }

    fn resolve(&self, row: &RowValues, params: &Params) -> Option<ParamValue> {
        match self {
            Operand::Column(column) => row.get(column).cloned(),
            Operand::Param(name) => params.get(name).cloned(),
            Operand::Int(value) => Some(ParamValue::Int(*value)),
        }
    }
}

/// Boolean expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every row.
    Always,
    /// Matches no row.
    Never,
    Eq(Operand, Operand),
    NotEq(Operand, Operand),
    /// A bound boolean placeholder used as a condition on its own.
    Flag(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(left: Operand, right: Operand) -> Self {
        Predicate::Eq(left, right)
    }

    pub fn not_eq(left: Operand, right: Operand) -> Self {
        Predicate::NotEq(left, right)
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Predicate::Flag(name.into())
    }

    /// Render with `:name` placeholders.
    pub fn render_named(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out, &mut |name| format!(":{}", name));
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String, placeholder: &mut dyn FnMut(&str) -> String) {
        match self {
            Predicate::Always => out.push_str("1 = 1"),
            Predicate::Never => out.push_str("1 != 1"),
            Predicate::Eq(left, right) => {
                left.write_sql(out, placeholder);
                out.push_str(" = ");
                right.write_sql(out, placeholder);
            }
            Predicate::NotEq(left, right) => {
                left.write_sql(out, placeholder);
                out.push_str(" <> ");
                right.write_sql(out, placeholder);
            }
            Predicate::Flag(name) => out.push_str(&placeholder(name)),
            Predicate::And(children) if children.is_empty() => out.push_str("1 = 1"),
            Predicate::Or(children) if children.is_empty() => out.push_str("1 != 1"),
            Predicate::And(children) => Self::write_joined(children, " AND ", out, placeholder),
            Predicate::Or(children) => Self::write_joined(children, " OR ", out, placeholder),
        }
    }

    fn write_joined(
        children: &[Predicate],
        separator: &str,
        out: &mut String,
        placeholder: &mut dyn FnMut(&str) -> String,
    ) {
        let wrap = children.len() > 1;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            if wrap && child.is_compound() {
                out.push('(');
                child.write_sql(out, placeholder);
                out.push(')');
            } else {
                child.write_sql(out, placeholder);
            }
        }
    }

    /// Whether rendering produces a top-level AND/OR that needs parentheses
    /// when nested.
    fn is_compound(&self) -> bool {
        match self {
            Predicate::And(children) | Predicate::Or(children) => match children.len() {
                0 => false,
                1 => children[0].is_compound(),
                _ => true,
            },
            _ => false,
        }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut scratch = String::new();
        self.write_sql(&mut scratch, &mut |name| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
            String::new()
        });
        names
    }

    /// Evaluate against an in-memory row. Missing columns or parameters
    /// behave like SQL NULL: comparisons involving them are false.
    pub fn evaluate(&self, row: &RowValues, params: &Params) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Never => false,
            Predicate::Eq(left, right) => {
                match (left.resolve(row, params), right.resolve(row, params)) {
                    (Some(a), Some(b)) => a.sql_eq(&b),
                    _ => false,
                }
            }
            Predicate::NotEq(left, right) => {
                match (left.resolve(row, params), right.resolve(row, params)) {
                    (Some(a), Some(b)) => !a.sql_eq(&b),
                    _ => false,
                }
            }
            Predicate::Flag(name) => params.get(name).is_some_and(ParamValue::is_truthy),
            Predicate::And(children) => children.iter().all(|c| c.evaluate(row, params)),
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(row, params)),
        }
    }
}

/// Column values of a single row, for [`Predicate::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct RowValues(HashMap<ColumnRef, ParamValue>);

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: ColumnRef, value: impl Into<ParamValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: ColumnRef, value: impl Into<ParamValue>) {
        self.0.insert(column, value.into());
    }

    pub fn get(&self, column: &ColumnRef) -> Option<&ParamValue> {
        self.0.get(column)
    }
}
