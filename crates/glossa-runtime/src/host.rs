#![forbid(unsafe_code)]

//! Observable host objects and bindings to their properties.
//!
//! A live translation only needs two things from whatever owns its inputs:
//! read a property's current value, and be told when it changes. That is
//! the [`PropertySource`] trait. [`ObservableObject`] is the stock
//! implementation: a named bag of [`Observable`] properties.
//!
//! A [`Binding`] names one property of one host. It holds the host weakly,
//! so bindings never keep a destroyed host alive; a binding to a dropped
//! host simply reads as unset.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use glossa_i18n::Value;

use crate::reactive::{Observable, Subscription};

/// Callback invoked with a property's new value (`None` when unset).
pub type PropertyCallback = Box<dyn Fn(Option<&Value>)>;

/// Something with named, observable properties.
pub trait PropertySource {
    /// Current value of `path`, or `None` when unset.
    fn current(&self, path: &str) -> Option<Value>;

    /// Call `callback` on every later change of `path` until the returned
    /// subscription is dropped. The callback is not invoked for the
    /// current value; read it with [`current`](Self::current).
    fn watch(&self, path: &str, callback: PropertyCallback) -> Subscription;
}

/// A host object whose properties are [`Observable`]s, created on first
/// use.
#[derive(Default)]
pub struct ObservableObject {
    name: String,
    props: RefCell<BTreeMap<String, Observable<Option<Value>>>>,
}

impl ObservableObject {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: RefCell::new(BTreeMap::new()),
        }
    }

    /// Convenience for `Rc::new(ObservableObject::new(name))`.
    #[must_use]
    pub fn shared(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::new(name))
    }

    /// Finish a builder chain as a shared host.
    #[must_use]
    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Builder-style initial property value.
    #[must_use]
    pub fn with(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props
            .borrow_mut()
            .insert(path.into(), Observable::new(Some(value.into())));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a property, notifying its observers if the value changed.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.property(path).set(Some(value.into()));
    }

    /// Clear a property, notifying its observers if it was set.
    pub fn unset(&self, path: &str) {
        self.property(path).set(None);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        self.props.borrow().get(path).and_then(Observable::get)
    }

    /// Live observers of `path`.
    #[must_use]
    pub fn observer_count(&self, path: &str) -> usize {
        self.props
            .borrow()
            .get(path)
            .map_or(0, Observable::live_subscriber_count)
    }

    /// The observable behind `path`, created unset if missing.
    #[must_use]
    pub fn property(&self, path: &str) -> Observable<Option<Value>> {
        self.props
            .borrow_mut()
            .entry(path.to_owned())
            .or_insert_with(|| Observable::new(None))
            .clone()
    }
}

impl PropertySource for ObservableObject {
    fn current(&self, path: &str) -> Option<Value> {
        self.get(path)
    }

    fn watch(&self, path: &str, callback: PropertyCallback) -> Subscription {
        self.property(path)
            .subscribe(move |value: &Option<Value>| callback(value.as_ref()))
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.props.borrow();
        f.debug_struct("ObservableObject")
            .field("name", &self.name)
            .field("properties", &props.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A reference to one property of one host.
#[derive(Clone)]
pub struct Binding {
    source: Weak<dyn PropertySource>,
    path: String,
}

impl Binding {
    /// Bind to `path` on `source`.
    pub fn new<S: PropertySource + 'static>(source: &Rc<S>, path: impl Into<String>) -> Self {
        let source: Rc<dyn PropertySource> = Rc::clone(source) as Rc<dyn PropertySource>;
        Self::from_dyn(&source, path)
    }

    /// Bind to `path` on an already type-erased host.
    pub fn from_dyn(source: &Rc<dyn PropertySource>, path: impl Into<String>) -> Self {
        Self {
            source: Rc::downgrade(source),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Identity of the host, stable while it is alive.
    #[must_use]
    pub fn source_id(&self) -> usize {
        Weak::as_ptr(&self.source) as *const () as usize
    }

    /// Whether the host still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.source.strong_count() > 0
    }

    /// The property's current value; `None` if unset or the host is gone.
    #[must_use]
    pub fn current(&self) -> Option<Value> {
        self.source.upgrade()?.current(&self.path)
    }

    /// Observe the property; `None` if the host is gone.
    pub fn watch(&self, callback: PropertyCallback) -> Option<Subscription> {
        Some(self.source.upgrade()?.watch(&self.path, callback))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("source_id", &self.source_id())
            .field("path", &self.path)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Named hosts for resolving binding paths such as `"TestNamespace.count"`
/// or `"view.favouriteBeer"`.
///
/// Hosts are held weakly.
#[derive(Default)]
pub struct HostRegistry {
    hosts: BTreeMap<String, Weak<dyn PropertySource>>,
}

impl HostRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `host` under `name`, replacing any previous host.
    pub fn register<S: PropertySource + 'static>(&mut self, name: impl Into<String>, host: &Rc<S>) {
        let host: Rc<dyn PropertySource> = Rc::clone(host) as Rc<dyn PropertySource>;
        self.hosts.insert(name.into(), Rc::downgrade(&host));
    }

    /// Remove `name`. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.hosts.remove(name).is_some()
    }

    /// Resolve `"<host>.<property>"` to a binding.
    ///
    /// The path splits on its first `.`; the remainder is the property
    /// path. Returns `None` for an unknown or dropped host, or a path
    /// without a property part.
    #[must_use]
    pub fn binding(&self, path: &str) -> Option<Binding> {
        let (host, property) = path.split_once('.')?;
        if property.is_empty() {
            return None;
        }
        let source = self.hosts.get(host)?;
        if source.strong_count() == 0 {
            return None;
        }
        Some(Binding {
            source: source.clone(),
            path: property.to_owned(),
        })
    }
}

impl fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRegistry")
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> PropertyCallback {
        Box::new(|_: Option<&Value>| {})
    }

    #[test]
    fn properties_start_unset() {
        let ns = ObservableObject::new("TestNamespace");
        assert_eq!(ns.get("count"), None);
        ns.set("count", 3);
        assert_eq!(ns.get("count"), Some(Value::Int(3)));
        ns.unset("count");
        assert_eq!(ns.current("count"), None);
    }

    #[test]
    fn watch_reports_changes_only() {
        let ns = ObservableObject::new("TestNamespace").with("count", 3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = ns.watch(
            "count",
            Box::new(move |v: Option<&Value>| sink.borrow_mut().push(v.cloned())),
        );
        assert!(seen.borrow().is_empty());

        ns.set("count", 4);
        ns.set("count", 4);
        ns.unset("count");
        assert_eq!(*seen.borrow(), vec![Some(Value::Int(4)), None]);

        drop(sub);
        ns.set("count", 5);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn observer_count_tracks_live_subscriptions() {
        let ns = ObservableObject::new("ns");
        assert_eq!(ns.observer_count("count"), 0);
        let a = ns.watch("count", noop());
        let _b = ns.watch("count", noop());
        assert_eq!(ns.observer_count("count"), 2);
        drop(a);
        assert_eq!(ns.observer_count("count"), 1);
    }

    #[test]
    fn binding_holds_host_weakly() {
        let host = ObservableObject::new("view").with("favouriteBeer", "IPA").into_shared();
        let binding = Binding::new(&host, "favouriteBeer");
        assert_eq!(binding.current(), Some(Value::from("IPA")));
        assert_eq!(Rc::strong_count(&host), 1);

        drop(host);
        assert!(!binding.is_alive());
        assert_eq!(binding.current(), None);
        assert!(binding.watch(noop()).is_none());
    }

    #[test]
    fn bindings_to_same_host_share_identity() {
        let host = ObservableObject::shared("ns");
        let other = ObservableObject::shared("ns");
        let a = Binding::new(&host, "count");
        let b = Binding::new(&host, "name");
        let c = Binding::new(&other, "count");
        assert_eq!(a.source_id(), b.source_id());
        assert_ne!(a.source_id(), c.source_id());
    }

    #[test]
    fn binding_watch_fires() {
        let host = ObservableObject::shared("ns");
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _sub = Binding::new(&host, "count")
            .watch(Box::new(move |_: Option<&Value>| hits_clone.set(hits_clone.get() + 1)))
            .expect("host alive");
        host.set("count", 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn registry_resolves_dotted_paths() {
        let ns = ObservableObject::new("TestNamespace").with("count", 3).into_shared();
        let mut registry = HostRegistry::new();
        registry.register("TestNamespace", &ns);

        let binding = registry.binding("TestNamespace.count").expect("registered");
        assert_eq!(binding.path(), "count");
        assert_eq!(binding.current(), Some(Value::Int(3)));

        assert!(registry.binding("Unknown.count").is_none());
        assert!(registry.binding("TestNamespace").is_none());
        assert!(registry.binding("TestNamespace.").is_none());
    }

    #[test]
    fn registry_property_path_keeps_remaining_dots() {
        let ns = ObservableObject::new("app").with("user.name", "Sue").into_shared();
        let mut registry = HostRegistry::new();
        registry.register("app", &ns);
        let binding = registry.binding("app.user.name").expect("registered");
        assert_eq!(binding.current(), Some(Value::from("Sue")));
    }

    #[test]
    fn registry_forgets_dropped_and_unregistered_hosts() {
        let ns = ObservableObject::shared("ns");
        let mut registry = HostRegistry::new();
        registry.register("ns", &ns);
        registry.register("gone", &ObservableObject::shared("gone"));
        assert!(registry.binding("gone.x").is_none());
        assert!(registry.unregister("ns"));
        assert!(!registry.unregister("ns"));
        assert!(registry.binding("ns.x").is_none());
    }
}
