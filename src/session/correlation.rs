//! Request/reply correlation table.
//!
//! One [`CorrelationTable`] tracks everything a session knows about its
//! in-flight traversal: which request ids still await a reply, which
//! stage each id belongs to, which replies have been matched but not
//! yet expanded, and the wake-up signal between the two session loops.
//!
//! # Structures
//!
//! | Structure | Contents |
//! |-----------|----------|
//! | Pending set | Ids sent but not yet consumed |
//! | Method history | Every id ever registered, mapped to its stage |
//! | Unhandled queue | Matched replies awaiting producer expansion |
//! | Ready signal | Consumer-to-producer "new reply" notification |
//!
//! The history never shrinks during a session, so the producer can
//! classify a reply by stage even after its id left the pending set.
//! All four structures live behind a single mutex because consumer and
//! producer interleave reads and writes unpredictably; no operation
//! holds the lock across a suspension point.
//!
//! A session is complete iff the pending set *and* the unhandled queue
//! are both empty. The conjunction is the correctness condition for
//! closing the channel: every request sent has been replied to, and
//! every reply has been consumed as a result or expanded into further
//! requests that are themselves accounted for.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Notify;

use crate::identifiers::RequestId;
use crate::protocol::{Reply, Stage};

// ============================================================================
// Types
// ============================================================================

/// The four tracking structures, guarded together.
struct TableState {
    /// Ids sent but not yet consumed.
    pending: FxHashSet<RequestId>,
    /// Every id ever registered, mapped to its stage. Never shrinks.
    history: FxHashMap<RequestId, Stage>,
    /// Matched replies not yet expanded by the producer.
    unhandled: VecDeque<Reply>,
    /// Set when a new reply is available for the producer.
    signal: bool,
}

// ============================================================================
// CorrelationTable
// ============================================================================

/// Per-session correlation state shared by the consumer and producer.
///
/// Created alongside the session and discarded with it; nothing here
/// survives across sessions.
pub struct CorrelationTable {
    /// Pending set, history, unhandled queue and signal flag.
    state: Mutex<TableState>,
    /// Wake-up half of the ready signal.
    notify: Notify,
}

impl CorrelationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                pending: FxHashSet::default(),
                history: FxHashMap::default(),
                unhandled: VecDeque::new(),
                signal: false,
            }),
            notify: Notify::new(),
        }
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CorrelationTable - Pending Set
// ============================================================================

impl CorrelationTable {
    /// Registers a freshly sent request id under its stage.
    ///
    /// Callers must pass ids not already pending; ids are minted by a
    /// monotonic generator, so reuse indicates a caller bug.
    pub fn register_pending(&self, id: RequestId, stage: Stage) {
        let mut state = self.state.lock();
        state.pending.insert(id);
        state.history.insert(id, stage);
    }

    /// Registers a batch of sibling request ids under one stage.
    pub fn register_pending_bulk(&self, ids: &[RequestId], stage: Stage) {
        let mut state = self.state.lock();
        for &id in ids {
            state.pending.insert(id);
            state.history.insert(id, stage);
        }
    }

    /// Looks up the stage an id was registered under.
    ///
    /// Returns `None` for ids never registered, which guards the
    /// engine against malformed or duplicate replies.
    #[must_use]
    pub fn resolve(&self, id: RequestId) -> Option<Stage> {
        self.state.lock().history.get(&id).copied()
    }

    /// Returns `true` if the id still awaits its reply.
    #[must_use]
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.state.lock().pending.contains(&id)
    }

    /// Returns `true` if the id is pending *and* belongs to `stage`.
    ///
    /// The consumer uses this to decide whether a reply is terminal
    /// (result-producing) or needs further expansion.
    #[must_use]
    pub fn is_pending_for(&self, id: RequestId, stage: Stage) -> bool {
        let state = self.state.lock();
        state.pending.contains(&id) && state.history.get(&id) == Some(&stage)
    }

    /// Removes an id from the pending set.
    ///
    /// Idempotent: returns whether anything was removed, so a
    /// duplicate reply can never double-decrement the set.
    pub fn mark_resolved(&self, id: RequestId) -> bool {
        self.state.lock().pending.remove(&id)
    }

    /// Number of ids still awaiting replies.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}

// ============================================================================
// CorrelationTable - Unhandled Queue
// ============================================================================

impl CorrelationTable {
    /// Appends a matched reply for later expansion by the producer.
    pub fn enqueue_unhandled(&self, reply: Reply) {
        self.state.lock().unhandled.push_back(reply);
    }

    /// Returns the queued replies in enqueue order without clearing.
    ///
    /// The producer removes each entry individually once handled, so a
    /// reply that arrives mid-drain is never lost.
    #[must_use]
    pub fn unhandled_snapshot(&self) -> Vec<Reply> {
        self.state.lock().unhandled.iter().cloned().collect()
    }

    /// Removes a handled reply from the queue, matching by id.
    ///
    /// Returns whether an entry was removed. Ids are session-unique,
    /// so at most one entry can match.
    pub fn remove_unhandled(&self, reply: &Reply) -> bool {
        let mut state = self.state.lock();
        match state.unhandled.iter().position(|queued| queued.id == reply.id) {
            Some(index) => {
                state.unhandled.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of replies awaiting expansion.
    #[must_use]
    pub fn unhandled_count(&self) -> usize {
        self.state.lock().unhandled.len()
    }
}

// ============================================================================
// CorrelationTable - Completion
// ============================================================================

impl CorrelationTable {
    /// Returns `true` once no request is pending *and* no reply awaits
    /// expansion.
    ///
    /// Either condition alone is insufficient: an empty pending set
    /// with a queued reply may still fan out into new requests, and an
    /// empty queue with pending ids is still waiting on the server.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.unhandled.is_empty()
    }
}

// ============================================================================
// CorrelationTable - Ready Signal
// ============================================================================

impl CorrelationTable {
    /// Signals the producer that a new reply was resolved.
    pub fn signal_new_reply(&self) {
        self.state.lock().signal = true;
        self.notify.notify_one();
    }

    /// Suspends the calling task until a new reply is signaled.
    ///
    /// Returns immediately if a signal is already set. The signal is
    /// left set; the producer clears it before draining the queue.
    pub async fn await_reply(&self) {
        loop {
            // Arm the wakeup before re-checking the flag so a signal
            // landing in between is not lost.
            let notified = self.notify.notified();
            if self.state.lock().signal {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` if a new-reply signal is currently set.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.state.lock().signal
    }

    /// Clears the new-reply signal.
    pub fn clear_signal(&self) {
        self.state.lock().signal = false;
    }
}

// ============================================================================
// Tests
// ============================================================================
