// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Activity counters for a [`SingleSlot`](crate::SingleSlot).

use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time snapshot of the activity of a [`SingleSlot`](crate::SingleSlot).
///
/// Counters only ever grow. Snapshots taken while callers are active may be
/// slightly out of date by the time they are inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SlotStats {
    /// Calls answered straight from the cached value.
    pub hits: u64,
    /// Producer invocations started.
    pub attempts: u64,
    /// Attempts that failed or panicked and were answered with the fallback.
    pub failures: u64,
    /// Calls that joined an attempt started by another caller.
    pub coalesced: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    attempts: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SlotStats {
        SlotStats {
            hits: self.hits.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_each_counter() {
        let counters = Counters::default();
        counters.hit();
        counters.hit();
        counters.attempt();
        counters.failure();
        counters.coalesced();
        counters.coalesced();
        counters.coalesced();

        assert_eq!(
            counters.snapshot(),
            SlotStats {
                hits: 2,
                attempts: 1,
                failures: 1,
                coalesced: 3,
            }
        );
    }

    #[test]
    fn fresh_counters_are_zero() {
        assert_eq!(Counters::default().snapshot(), SlotStats::default());
    }
}
