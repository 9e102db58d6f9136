//! Core types shared across the gcm crates.
//!
//! The visibility filter never talks to a database, a permission engine or a
//! view framework directly. Everything it needs is expressed here as plain
//! types and small traits, so callers plug their own storage in:
//!
//! - [`Account`] for the current user and its site-wide permissions
//! - [`ViewArguments`] for the argument bindings and positional arguments of a request
//! - [`GroupStorage`] / [`Group`] for loading a group and asking it for permissions
//! - [`RelationTypeRegistry`] for the content relations a group can hold

pub mod account;
pub mod arguments;
pub mod config;
pub mod fixture;
pub mod group;
pub mod relation;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use account::{Account, UserAccount};
pub use arguments::{ArgumentBinding, ViewArguments};
pub use config::{ConfigError, FilterConfig, GcmConfig};
pub use fixture::{
    ContentRow, Fixture, GroupFixture, MemberFixture, MemoryGroup, MemoryGroupStorage,
    StaticRelationRegistry,
};
pub use group::{Group, GroupStorage};
pub use relation::{RelationDefinition, RelationTypeRegistry};

/// Identifier of a user account. `0` is reserved for the anonymous user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl UserId {
    /// The anonymous user.
    pub const ANONYMOUS: UserId = UserId(0);

    pub fn is_anonymous(self) -> bool {
        self == Self::ANONYMOUS
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a group entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
