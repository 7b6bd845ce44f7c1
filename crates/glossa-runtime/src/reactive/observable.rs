#![forbid(unsafe_code)]

//! Version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] keeps a value in shared `Rc<RefCell<..>>` storage.
//! When a mutation changes the value (by `PartialEq`), live subscribers
//! are notified in registration order, or queued for the active
//! [`BatchScope`](super::BatchScope).
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: a [`Subscription`] kept forever keeps its
//!   callback alive. Dropped subscriptions are pruned lazily on notify.
//! - **Dropped during a batch**: a queued notification whose
//!   subscription was dropped before the flush does not run.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::info_span;

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Weak so that dropping a [`Subscription`] is enough to unsubscribe.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` yields another handle to the same value and
/// subscriber list.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
/// 4. A callback never runs after its [`Subscription`] is dropped.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Safe to call from inside a subscriber callback.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value == old {
                false
            } else {
                inner.version += 1;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Register `callback` for future changes. It is not called with the
    /// current value.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of value-changing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Subscribers whose [`Subscription`] is still alive.
    #[must_use]
    pub fn live_subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn notify(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };
        if callbacks.is_empty() {
            return;
        }

        if super::batch::is_batching() {
            for cb in callbacks {
                let key = Rc::as_ptr(&cb) as *const () as usize;
                let cb = Rc::downgrade(&cb);
                let source = Rc::downgrade(&self.inner);
                super::batch::defer_or_run_keyed(key, move || {
                    let (Some(cb), Some(source)) = (cb.upgrade(), source.upgrade()) else {
                        return;
                    };
                    let latest = source.borrow().value.clone();
                    cb(&latest);
                });
            }
            return;
        }

        let value = self.inner.borrow().value.clone();
        let _span = info_span!("glossa.property.notify", subscribers = callbacks.len()).entered();
        for cb in &callbacks {
            cb(&value);
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Holds the only strong reference to the callback; dropping it leaves the
/// observable with a dead `Weak` that is skipped and later pruned.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
