//! Argument bindings of the current view request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named argument handler attached to a view.
///
/// `plugin_id` identifies what kind of argument handler it is (a group id
/// handler is `group_id`), `position` is the index into the positional
/// arguments of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentBinding {
    pub plugin_id: String,
    pub position: usize,
}

impl ArgumentBinding {
    pub fn new(plugin_id: impl Into<String>, position: usize) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            position,
        }
    }
}

/// Bindings by name plus the raw positional arguments of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewArguments {
    #[serde(default)]
    bindings: BTreeMap<String, ArgumentBinding>,

    #[serde(default)]
    args: Vec<String>,
}

impl ViewArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(mut self, name: impl Into<String>, binding: ArgumentBinding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Look up the binding registered under `name`.
    pub fn binding(&self, name: &str) -> Option<&ArgumentBinding> {
        self.bindings.get(name)
    }

    /// The positional argument at `position`, if the request carries one.
    pub fn positional(&self, position: usize) -> Option<&str> {
        self.args.get(position).map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_lookup() {
        let args = ViewArguments::new()
            .with_binding("gid", ArgumentBinding::new("group_id", 1))
            .with_args(["all", "5"]);

        let binding = args.binding("gid").unwrap();
        assert_eq!(binding.plugin_id, "group_id");
        assert_eq!(args.positional(binding.position), Some("5"));
        assert!(args.binding("nid").is_none());
    }

    #[test]
    fn test_positional_out_of_range() {
        let args = ViewArguments::new().with_args(["5"]);
        assert_eq!(args.positional(0), Some("5"));
        assert_eq!(args.positional(3), None);
    }
}
