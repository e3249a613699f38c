use common::ObjectId;
use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out object ids for new catalog objects.
///
/// Ids increase monotonically for the lifetime of the database and are never
/// handed out twice, so an id stays unique even after its object is dropped.
#[derive(Debug)]
pub struct ObjectIdAllocator {
    next: AtomicU32,
}

impl ObjectIdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// # Panics
    ///
    /// Panics once the 32-bit id space is exhausted; the database cannot
    /// create further objects and must not continue.
    pub fn allocate(&self) -> ObjectId {
        let id = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .unwrap_or_else(|_| panic!("object id space exhausted"));
        ObjectId(id)
    }
}

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
