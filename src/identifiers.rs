//! Typed identifiers used throughout the crate.
//!
//! Wrapping raw integers in newtypes keeps request ids and document ids
//! from being confused for one another at API boundaries. All identifier
//! types serialize transparently as plain JSON numbers.
//!
//! # Identifier Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`RequestId`] | Correlates one outbound request with its reply |
//! | [`DocumentId`] | Names the remote document whose tree is crawled |
//! | [`RequestIdGenerator`] | Mints session-unique [`RequestId`]s |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// RequestId
// ============================================================================

/// Identifier correlating an outbound request with its inbound reply.
///
/// Every request carries a session-unique id; the reply echoes it back.
/// Ids are minted by [`RequestIdGenerator`] and never reused within a
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request id from a raw value.
    ///
    /// Mostly useful in tests; production code should mint ids through
    /// [`RequestIdGenerator::next_id`].
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestIdGenerator
// ============================================================================

/// Monotonic source of [`RequestId`]s.
///
/// Ids start at 1 and increase by 1 per call. The generator is safe to
/// share across tasks; concurrent callers receive distinct ids.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id, advancing the counter.
    #[inline]
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DocumentId
// ============================================================================

/// Identifier of a remote document.
///
/// The crawl entry point takes a `DocumentId`; it flows into the root
/// request's parameters and is otherwise opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Creates a document id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_generator_starts_at_one() {
        let generator = RequestIdGenerator::new();
        assert_eq!(generator.next_id(), RequestId::new(1));
        assert_eq!(generator.next_id(), RequestId::new(2));
        assert_eq!(generator.next_id(), RequestId::new(3));
    }

    #[test]
    fn test_request_id_serializes_as_number() {
        let id = RequestId::new(17);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "17");

        let back: RequestId = serde_json::from_str("17").unwrap();
        assert_eq!(back, id);
        assert_eq!(back.value(), 17);
    }

    #[test]
    fn test_document_id_serializes_as_number() {
        let id = DocumentId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let back: DocumentId = serde_json::from_str("42").unwrap();
        assert_eq!(back.value(), id.value());
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestId::new(5).to_string(), "5");
        assert_eq!(DocumentId::new(99).to_string(), "99");
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let generator = Arc::new(RequestIdGenerator::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let generator = Arc::clone(&generator);
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| generator.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 800);
    }

    proptest! {
        #[test]
        fn prop_sequential_ids_increase(count in 1usize..200) {
            let generator = RequestIdGenerator::new();
            let ids: Vec<_> = (0..count).map(|_| generator.next_id()).collect();

            for pair in ids.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            prop_assert_eq!(ids[0], RequestId::new(1));
        }
    }
}
