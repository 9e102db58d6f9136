//! Group entities and their storage.

use std::sync::Arc;

use crate::{Account, GroupId};

/// A loaded group. Permissions asked here are scoped to the group.
pub trait Group: Send + Sync {
    fn id(&self) -> GroupId;

    fn has_permission(&self, permission: &str, account: &dyn Account) -> bool;
}

/// Loads groups by id.
///
/// `Ok(None)` means the id does not match a stored group. An `Err` is a
/// storage failure; the filter treats both as an unresolved group.
pub trait GroupStorage: Send + Sync {
    fn load(&self, id: GroupId) -> anyhow::Result<Option<Arc<dyn Group>>>;
}
