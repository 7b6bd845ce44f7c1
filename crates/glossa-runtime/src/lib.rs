#![forbid(unsafe_code)]

//! Glossa Runtime
//!
//! Single-threaded reactive layer on top of `glossa-i18n`.
//!
//! # Key Components
//!
//! - [`Observable`] - Version-tracked value with change subscribers
//! - [`BatchScope`] - One external update cycle; notifications coalesce until it exits
//! - [`PropertySource`] - The observable-property capability a host provides
//! - [`ObservableObject`] - Stock host: a named bag of observable properties
//! - [`HostRegistry`] - Resolves paths like `"TestNamespace.count"` to bindings
//! - [`LiveTranslation`] - A resolution re-published whenever a bound input changes
//!
//! # How it fits in the system
//! `glossa-i18n` resolves a key once. This crate keeps a resolution live:
//! it observes the host properties a translation's parameters are bound
//! to and re-runs the pipeline when they change, at most once per batch.

pub mod host;
pub mod live;
pub mod reactive;

pub use host::{Binding, HostRegistry, ObservableObject, PropertyCallback, PropertySource};
pub use live::{LiveParam, LiveParams, LiveTranslation};
pub use reactive::{BatchScope, Observable, Subscription};
