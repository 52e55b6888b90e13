//! Entity contract shared by every repository.
//!
//! A storable type only needs a stable [`EntityId`]. Upsert-style writes are
//! routed by the caller through [`Write`]; types that carry a transient
//! "is new" marker implement [`Upsertable`] and convert with
//! [`Write::from_marked`].

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Globally unique entity identifier.
///
/// The nil UUID is reserved: it never identifies a stored record and
/// repositories reject it as a lookup key.
///
/// Serialises as the hyphenated string in every format, so document stores
/// key records by the same text that id filters match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Wrap an existing UUID.
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random (v4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The reserved zero identifier.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// True for the reserved zero identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<EntityId> for Uuid {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A domain type that can be stored by a repository.
///
/// Entities are value-like and caller-owned; repositories clone them in and
/// out and never keep references after a call returns.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Stable identifier of this record.
    fn id(&self) -> EntityId;
}

/// Entities carrying a transient, non-persisted "is new" marker.
pub trait Upsertable: Entity {
    /// True when the entity has never been stored.
    fn is_new(&self) -> bool;
}

/// An upsert decided by the caller: insert a new record or fully replace an
/// existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write<T> {
    /// Store a record that does not exist yet.
    Insert(T),
    /// Replace every persisted field of an existing record.
    Replace(T),
}

impl<T> Write<T> {
    /// Borrow the entity being written.
    pub const fn entity(&self) -> &T {
        match self {
            Self::Insert(entity) | Self::Replace(entity) => entity,
        }
    }

    /// Consume the write, returning the entity.
    pub fn into_entity(self) -> T {
        match self {
            Self::Insert(entity) | Self::Replace(entity) => entity,
        }
    }

    /// True for [`Write::Insert`].
    pub const fn is_insert(&self) -> bool {
        matches!(self, Self::Insert(_))
    }
}

impl<T: Upsertable> Write<T> {
    /// Route an entity by its own marker: new entities insert, others replace.
    ///
    /// # Examples
    /// ```
    /// use datastore::domain::{Entity, EntityId, Upsertable, Write};
    ///
    /// #[derive(Clone)]
    /// struct Draft { id: EntityId, is_new: bool }
    ///
    /// impl Entity for Draft {
    ///     fn id(&self) -> EntityId { self.id }
    /// }
    ///
    /// impl Upsertable for Draft {
    ///     fn is_new(&self) -> bool { self.is_new }
    /// }
    ///
    /// let write = Write::from_marked(Draft { id: EntityId::random(), is_new: true });
    /// assert!(write.is_insert());
    /// ```
    pub fn from_marked(entity: T) -> Self {
        if entity.is_new() {
            Self::Insert(entity)
        } else {
            Self::Replace(entity)
        }
    }
}
