//! Single-slot, last-write-wins mailbox.
//!
//! Rapid viewport changes (one per animation frame during a drag) are
//! coalesced here so the planner only ever sees the newest state, never a
//! backlog. The slot is an `ArcSwapOption`: `put` stores a new value over
//! whatever was there, `try_take` swaps in `None` and returns what it got.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Holds at most one pending value.
pub struct Mailbox<T> {
    slot: ArcSwapOption<T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Store a value, discarding any unconsumed one.
    pub fn put(&self, value: T) {
        self.slot.store(Some(Arc::new(value)));
    }

    /// Take the pending value, leaving the slot empty.
    pub fn try_take(&self) -> Option<Arc<T>> {
        self.slot.swap(None)
    }

    /// Whether a value is waiting. May be stale by the time it returns.
    pub fn has_pending(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("pending", &self.has_pending())
            .finish()
    }
}
