#![forbid(unsafe_code)]

//! Single-threaded change-tracking primitives.
//!
//! - [`Observable`]: a shared, version-tracked value with subscriber
//!   callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`BatchScope`]: RAII guard delimiting one external update cycle;
//!   notifications are deferred until the outermost scope exits.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for shared ownership and keeps
//! subscribers as `Weak` callbacks. `BatchScope` uses a thread-local queue
//! with keyed entries so repeated work for the same target coalesces.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per value-changing mutation.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current one does nothing.
//! 4. Within a `BatchScope`, values update immediately and notifications
//!    wait for the outermost scope to exit.

pub mod batch;
pub mod observable;

pub use batch::BatchScope;
pub use observable::{Observable, Subscription};
