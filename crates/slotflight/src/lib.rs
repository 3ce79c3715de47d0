// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A single-slot async cache with coalesced computation and graceful fallback.
//!
//! This crate provides [`SingleSlot`], which memoizes the result of one expensive, fallible
//! asynchronous computation (for example, fetching a configuration document or a custom sort
//! order from a remote service):
//!
//! - **Memoization**: once the producer succeeds, the value is cached for the life of the slot
//!   and every later call returns it without running the producer again.
//! - **Coalescing**: callers that arrive while nothing is cached attach to the one computation
//!   that is already in flight instead of starting their own.
//! - **Fallback**: when an attempt fails, every caller attached to it receives the fallback
//!   value. The fallback is never cached, so the next call starts a fresh attempt.
//!
//! # Example
//!
//! ```
//! use slotflight::SingleSlot;
//!
//! # async fn example() {
//! let order = SingleSlot::new(
//!     || async {
//!         // An expensive lookup that may fail.
//!         Ok::<_, std::io::Error>(vec!["tomato".to_string(), "basil".to_string()])
//!     },
//!     Vec::new,
//! );
//!
//! // The first call runs the producer, the rest are served from the cache.
//! let first = order.get_or_await().await;
//! let second = order.get_or_await().await;
//! assert_eq!(first, second);
//! # }
//! ```
//!
//! # Cancellation and Panic Safety
//!
//! - The computation of an attempt is shared by every caller attached to it. Dropping one
//!   caller's future detaches only that caller; the computation keeps going for the others.
//! - If every attached caller is dropped, the computation is dropped with them and the next
//!   call starts a new attempt.
//! - A panicking producer is treated like a failed attempt: the attached callers receive the
//!   fallback value and the slot is left ready for a fresh attempt.
//!
//! # Thread Safety
//!
//! [`SingleSlot`] is `Send` and `Sync` and cheap to clone; clones share the same slot. The
//! cached value and the in-flight attempt are guarded by a single lock per slot which is never
//! held across an `.await`.

use std::{
    fmt::{Debug, Display},
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared, WeakShared},
};
use parking_lot::Mutex;

mod stats;

pub use stats::SlotStats;

use stats::Counters;

type Producer<T> = dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync;
type Fallback<T> = dyn Fn() -> T + Send + Sync;
type Attempt<T> = Shared<BoxFuture<'static, T>>;

/// A cache for exactly one lazily computed value.
///
/// See the [crate documentation](crate) for an overview.
pub struct SingleSlot<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    producer: Box<Producer<T>>,
    fallback: Box<Fallback<T>>,
    counters: Counters,
}

struct State<T> {
    value: Option<T>,
    in_flight: Option<InFlight<T>>,
    last_attempt: u64,
}

/// Handle to the attempt currently being computed.
///
/// The handle is weak: the computation lives only as long as some caller is waiting on it.
struct InFlight<T> {
    attempt: u64,
    handle: WeakShared<BoxFuture<'static, T>>,
}

impl<T> SingleSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty slot.
    ///
    /// `producer` computes the value; it is invoked once per attempt and may fail. `fallback`
    /// supplies the value handed out for a failed attempt; it is invoked exactly once per
    /// failed attempt and its result is never cached.
    ///
    /// # Example
    ///
    /// ```
    /// use slotflight::SingleSlot;
    ///
    /// let slot = SingleSlot::new(|| async { Ok::<_, std::fmt::Error>(42) }, || 0);
    /// assert!(!slot.is_cached());
    /// ```
    #[must_use]
    pub fn new<P, Fut, E, F>(producer: P, fallback: F) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let producer = move || {
            let work = producer();
            async move { work.await.map_err(|error| error.to_string()) }.boxed()
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    value: None,
                    in_flight: None,
                    last_attempt: 0,
                }),
                producer: Box::new(producer),
                fallback: Box::new(fallback),
                counters: Counters::default(),
            }),
        }
    }

    /// Creates an empty slot whose fallback is a clone of `fallback`.
    #[must_use]
    pub fn with_fallback_value<P, Fut, E>(producer: P, fallback: T) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Self::new(producer, move || fallback.clone())
    }

    /// Returns the cached value, computing it first if necessary.
    ///
    /// - If a value is cached, it is returned immediately and the producer is not invoked.
    /// - If another caller already started an attempt, this call waits for that attempt.
    /// - Otherwise this call starts a new attempt.
    ///
    /// A successful attempt caches its value and hands it to every attached caller. A failed
    /// attempt hands every attached caller the fallback value and caches nothing, so this
    /// method never fails.
    pub async fn get_or_await(&self) -> T {
        let attempt = {
            let mut state = self.inner.state.lock();

            if let Some(value) = &state.value {
                self.inner.counters.hit();
                return value.clone();
            }

            match state.in_flight.as_ref().and_then(|in_flight| in_flight.handle.upgrade()) {
                Some(attempt) => {
                    self.inner.counters.coalesced();
                    tracing::debug!(attempt = state.last_attempt, "joining in-flight computation");
                    attempt
                }
                None => self.start_attempt(&mut state),
            }
        };

        attempt.await
    }

    /// Returns the cached value without computing anything.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.state.lock().value.clone()
    }

    /// Returns `true` if an attempt has succeeded and its value is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.inner.state.lock().value.is_some()
    }

    /// Returns `true` if an attempt is being computed and has callers waiting on it.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.inner
            .state
            .lock()
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.handle.upgrade().is_some())
    }

    /// Returns a snapshot of the activity counters of this slot.
    #[must_use]
    pub fn stats(&self) -> SlotStats {
        self.inner.counters.snapshot()
    }

    /// Must be called with the state lock held, so only one attempt is ever started per miss.
    fn start_attempt(&self, state: &mut State<T>) -> Attempt<T> {
        state.last_attempt += 1;
        let attempt = state.last_attempt;

        let inner = Arc::clone(&self.inner);
        let shared = inner.run_attempt(attempt).boxed().shared();

        // A freshly created future cannot have completed, so downgrading always succeeds.
        state.in_flight = shared.downgrade().map(|handle| InFlight { attempt, handle });

        tracing::debug!(attempt, "starting computation");
        shared
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run_attempt(self: Arc<Self>, attempt: u64) -> T {
        self.counters.attempt();

        let outcome = AssertUnwindSafe(async { (self.producer)().await })
            .catch_unwind()
            .await;

        let failure = {
            let mut state = self.state.lock();
            if state.in_flight.as_ref().is_some_and(|in_flight| in_flight.attempt == attempt) {
                state.in_flight = None;
            }

            match outcome {
                Ok(Ok(value)) => {
                    state.value = Some(value.clone());
                    tracing::debug!(attempt, "computation succeeded, value cached");
                    return value;
                }
                Ok(Err(error)) => error,
                Err(_) => "producer panicked".to_string(),
            }
        };

        self.counters.failure();
        tracing::warn!(attempt, error = %failure, "computation failed, using fallback value");
        (self.fallback)()
    }
}

impl<T> Clone for SingleSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for SingleSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleSlot")
            .field("cached", &self.is_cached())
            .field("in_flight", &self.is_in_flight())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn new_slot_is_empty() {
        let slot = SingleSlot::new(|| async { Ok::<_, String>(1) }, || 0);

        assert!(!slot.is_cached());
        assert!(!slot.is_in_flight());
        assert_eq!(slot.get(), None);
        assert_eq!(slot.stats(), SlotStats::default());
    }

    #[tokio::test]
    async fn clones_share_the_cached_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let slot = SingleSlot::new(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::AcqRel);
                    Ok::<_, String>("value".to_string())
                }
            },
            String::new,
        );
        let clone = slot.clone();

        assert_eq!(slot.get_or_await().await, "value");
        assert_eq!(clone.get_or_await().await, "value");
        assert_eq!(clone.get().as_deref(), Some("value"));
        assert_eq!(calls.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn with_fallback_value_hands_out_clones() {
        let slot = SingleSlot::with_fallback_value(|| async { Err::<Vec<u8>, _>("offline") }, vec![7]);

        assert_eq!(slot.get_or_await().await, vec![7]);
        assert_eq!(slot.get_or_await().await, vec![7]);
        assert!(!slot.is_cached());
        assert_eq!(slot.stats().failures, 2);
    }

    #[tokio::test]
    async fn debug_does_not_require_debug_value() {
        struct Opaque;

        impl Clone for Opaque {
            fn clone(&self) -> Self {
                Self
            }
        }

        let slot = SingleSlot::new(|| async { Ok::<_, String>(Opaque) }, || Opaque);
        let before = format!("{slot:?}");
        assert!(before.contains("SingleSlot"));
        assert!(before.contains("cached: false"));

        let _ = slot.get_or_await().await;
        assert!(format!("{slot:?}").contains("cached: true"));
    }

    #[test]
    fn abandoned_attempt_is_replaced_by_the_next_caller() {
        let slot = SingleSlot::new(
            || async {
                std::future::pending::<()>().await;
                Ok::<_, String>(1)
            },
            || 0,
        );

        // Polls once, which starts the attempt, then drops the only waiter.
        assert!(slot.get_or_await().now_or_never().is_none());
        assert!(!slot.is_in_flight());

        assert!(slot.get_or_await().now_or_never().is_none());
        assert_eq!(slot.inner.state.lock().last_attempt, 2);
        assert_eq!(slot.stats().coalesced, 0);
    }
}
