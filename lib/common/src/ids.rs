//! Identifier newtypes shared across the catalog, lock and session layers.

use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;
use std::fmt;

/// Unique identifier for a catalog object (schema, table, index). Object ids are
/// handed out by the database's allocator and are never reused while the
/// database is open.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Shrinkwrap,
)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn new(object_id: u32) -> Self {
        Self(object_id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ObjectId {
    fn from(object_id: u32) -> Self {
        Self(object_id)
    }
}

impl From<ObjectId> for u32 {
    fn from(object_id: ObjectId) -> Self {
        object_id.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Unique identifier for a client session. Sessions are the unit of lock
/// ownership: a lock is always held on behalf of exactly one session.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Shrinkwrap,
)]
pub struct SessionId(pub u64);

impl From<u64> for SessionId {
    fn from(session_id: u64) -> Self {
        Self(session_id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}
