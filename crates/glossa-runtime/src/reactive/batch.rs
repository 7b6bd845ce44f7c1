#![forbid(unsafe_code)]

//! Update batches: coalescing [`Observable`](super::Observable)
//! notifications into one external update cycle.
//!
//! While a [`BatchScope`] is alive, values change immediately but
//! notifications are queued. When the outermost scope drops, the queue is
//! drained. Callbacks that enqueue more work while draining (a live
//! translation reacting to a property change, for example) are picked up
//! in a further round of the same flush, so keyed work coalesces across
//! every property touched in the batch.
//!
//! # Usage
//!
//! ```
//! use glossa_runtime::reactive::{BatchScope, Observable};
//!
//! let first = Observable::new(0);
//! let second = Observable::new(0);
//! {
//!     let _batch = BatchScope::new();
//!     first.set(1);  // deferred
//!     second.set(2); // deferred
//!     first.set(3);  // coalesced with the first `first.set`
//! } // subscribers run here and observe 3 and 2
//! ```
//!
//! # Invariants
//!
//! 1. Nested scopes are supported: only the outermost scope flushes.
//! 2. Within a batch, `Observable::get()` returns the latest value.
//! 3. After a batch exits, subscribers have seen the final state only.
//! 4. Entries run in the order they were first enqueued; re-keying an
//!    entry keeps its position and replaces its callback.
//! 5. A flush stops after [`MAX_FLUSH_ROUNDS`] rounds; anything still
//!    queued then is dropped with a warning.
//!
//! # Failure Modes
//!
//! - **Callback panics during flush**: remaining callbacks still run, the
//!   batch context is cleared, then the first panic is re-raised.

use std::any::Any;
use std::cell::RefCell;

use tracing::{info_span, warn};
use web_time::Instant;

/// Upper bound on drain rounds per flush, guarding against callbacks that
/// keep re-enqueueing each other.
pub const MAX_FLUSH_ROUNDS: u32 = 64;

type DeferredNotify = Box<dyn FnOnce()>;

struct DeferredEntry {
    key: Option<usize>,
    notify: DeferredNotify,
}

struct BatchContext {
    depth: u32,
    deferred: Vec<DeferredEntry>,
    /// Set while the outermost scope drains; scopes opened by callbacks
    /// leave draining to it.
    flushing: bool,
}

thread_local! {
    static BATCH_CTX: RefCell<Option<BatchContext>> = const { RefCell::new(None) };
}

/// Whether a batch is active (or draining) on this thread.
pub fn is_batching() -> bool {
    BATCH_CTX.with(|ctx| ctx.borrow().is_some())
}

/// Queue `f` until the current batch exits, or run it now if there is no
/// batch. Returns `true` if deferred.
pub fn defer_or_run(f: impl FnOnce() + 'static) -> bool {
    enqueue(None, Box::new(f))
}

/// Like [`defer_or_run`], but an entry already queued under `key` is
/// replaced in place instead of adding a second one.
pub fn defer_or_run_keyed(key: usize, f: impl FnOnce() + 'static) -> bool {
    enqueue(Some(key), Box::new(f))
}

fn enqueue(key: Option<usize>, notify: DeferredNotify) -> bool {
    let immediate = BATCH_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        let Some(batch) = guard.as_mut() else {
            return Some(notify);
        };
        let existing = key.and_then(|k| batch.deferred.iter().position(|e| e.key == Some(k)));
        match existing {
            Some(index) => batch.deferred[index].notify = notify,
            None => batch.deferred.push(DeferredEntry { key, notify }),
        }
        None
    });

    match immediate {
        Some(notify) => {
            notify();
            false
        }
        None => true,
    }
}

fn take_round() -> Vec<DeferredNotify> {
    BATCH_CTX.with(|ctx| {
        ctx.borrow_mut()
            .as_mut()
            .map(|batch| {
                std::mem::take(&mut batch.deferred)
                    .into_iter()
                    .map(|entry| entry.notify)
                    .collect()
            })
            .unwrap_or_default()
    })
}

/// Drain the queue in rounds. Returns the first panic payload, if any.
fn flush() -> Option<Box<dyn Any + Send>> {
    let mut round = take_round();
    if round.is_empty() {
        return None;
    }

    let start = Instant::now();
    let span = info_span!(
        "glossa.batch.flush",
        notifications = tracing::field::Empty,
        rounds = tracing::field::Empty,
        duration_us = tracing::field::Empty
    );
    let _entered = span.enter();

    let mut first_panic = None;
    let mut notifications = 0_u64;
    let mut rounds = 0_u32;
    while !round.is_empty() {
        rounds += 1;
        if rounds > MAX_FLUSH_ROUNDS {
            warn!(
                dropped = round.len(),
                "batch flush exceeded {MAX_FLUSH_ROUNDS} rounds"
            );
            break;
        }
        notifications += round.len() as u64;
        for notify in round {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(notify));
            if let Err(payload) = result
                && first_panic.is_none()
            {
                first_panic = Some(payload);
            }
        }
        round = take_round();
    }

    span.record("notifications", notifications);
    span.record("rounds", rounds);
    span.record("duration_us", start.elapsed().as_micros() as u64);
    first_panic
}

/// RAII guard for one external update cycle.
///
/// Nested scopes only deepen the current batch; the outermost one flushes
/// when it drops.
pub struct BatchScope {
    is_root: bool,
}

impl BatchScope {
    /// Begin a batch, or join the one already active.
    #[must_use]
    pub fn new() -> Self {
        let is_root = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match guard.as_mut() {
                Some(batch) => {
                    batch.depth += 1;
                    false
                }
                None => {
                    *guard = Some(BatchContext {
                        depth: 1,
                        deferred: Vec::new(),
                        flushing: false,
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Entries queued in the current batch.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        BATCH_CTX.with(|ctx| ctx.borrow().as_ref().map_or(0, |b| b.deferred.len()))
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let should_flush = BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match guard.as_mut() {
                Some(batch) => {
                    batch.depth = batch.depth.saturating_sub(1);
                    if batch.depth == 0 && !batch.flushing {
                        batch.flushing = true;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        });

        if should_flush {
            let panic = flush();
            BATCH_CTX.with(|ctx| {
                *ctx.borrow_mut() = None;
            });
            if let Some(payload) = panic {
                std::panic::resume_unwind(payload);
            }
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}
