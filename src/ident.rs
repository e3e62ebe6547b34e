//! Identifier types for extraction artifacts.
//!
//! Every entity, relation, assertion, and event is keyed by a niche-optimized
//! `NonZeroU64` newtype allocated by an [`AtomicIdAllocator`]. IDs are opaque:
//! nothing in the engine parses or interprets them, and the chunked driver is
//! free to remap them wholesale when merging macro-chunks.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Create from a raw `u64`. Returns `None` if `raw` is zero.
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map($name)
            }

            /// Get the underlying `u64` value.
            pub fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier for a minted entity within one document (or globally, once merged).
    EntityId,
    "ent"
);
id_newtype!(
    /// Identifier for an extracted relation.
    RelationId,
    "rel"
);
id_newtype!(
    /// Identifier for an assertion in the epistemic IR.
    AssertionId,
    "asrt"
);
id_newtype!(
    /// Identifier for a story event.
    EventId,
    "evt"
);

/// Thread-safe monotone ID allocator starting from 1.
///
/// One allocator is scoped to each document context; the global graph owns
/// its own. Safe to share via `Arc`.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    /// Create a new allocator that starts from ID 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Create an allocator that resumes from a given ID.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Allocate the next raw ID. Never returns zero.
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate the next entity ID.
    pub fn next_entity(&self) -> EntityId {
        EntityId::new(self.next_raw()).expect("allocator starts at 1")
    }

    /// Allocate the next relation ID.
    pub fn next_relation(&self) -> RelationId {
        RelationId::new(self.next_raw()).expect("allocator starts at 1")
    }

    /// Allocate the next assertion ID.
    pub fn next_assertion(&self) -> AssertionId {
        AssertionId::new(self.next_raw()).expect("allocator starts at 1")
    }

    /// Allocate the next event ID.
    pub fn next_event(&self) -> EventId {
        EventId::new(self.next_raw()).expect("allocator starts at 1")
    }

    /// The next ID that would be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
