//! The current user.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::UserId;

/// A user account as seen by the filter.
///
/// `has_permission` answers site-wide permissions only (for example
/// `bypass node access`). Group-scoped permissions are answered by
/// [`crate::Group::has_permission`].
pub trait Account: Send + Sync {
    fn id(&self) -> UserId;

    fn has_permission(&self, permission: &str) -> bool;

    fn is_anonymous(&self) -> bool {
        self.id().is_anonymous()
    }
}

/// Plain account with a fixed set of site-wide permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,

    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl UserAccount {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            permissions: BTreeSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(UserId::ANONYMOUS)
    }

    /// Grant a site-wide permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
}

impl Account for UserAccount {
    fn id(&self) -> UserId {
        self.id
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
