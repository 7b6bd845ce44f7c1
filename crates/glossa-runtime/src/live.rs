#![forbid(unsafe_code)]

//! Live translations: resolutions that re-publish when a bound input
//! changes.
//!
//! A [`LiveTranslation`] owns an explicit table of property observers, one
//! per `(host, property)` pair its parameters are bound to. Any change
//! notification schedules a re-resolution keyed by the live translation
//! itself, so inside a [`BatchScope`](crate::reactive::BatchScope) every
//! change to its inputs collapses into one re-resolution computed from the
//! batch's final values.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Re-resolution returns an error | Warning logged, previous output kept |
//! | First resolution returns an error | Warning logged, missing-key fallback delivered |
//! | Bound host dropped | Parameter treated as absent |
//! | Torn down while a notification runs | That notification completes, no later one starts |

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use glossa_i18n::{Params, Translator, Value};
use tracing::{debug, info_span, warn};

use crate::host::{Binding, HostRegistry};
use crate::reactive::Subscription;
use crate::reactive::batch;

/// One parameter of a live resolution: a fixed value or a binding.
#[derive(Debug, Clone)]
pub enum LiveParam {
    Value(Value),
    Bound(Binding),
}

impl From<Value> for LiveParam {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Binding> for LiveParam {
    fn from(binding: Binding) -> Self {
        Self::Bound(binding)
    }
}

/// Named parameters, some of which may be bound to host properties.
#[derive(Debug, Clone, Default)]
pub struct LiveParams {
    entries: BTreeMap<String, LiveParam>,
}

impl LiveParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style fixed value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, LiveParam::Value(value.into()));
        self
    }

    /// Builder-style binding.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.insert(name, LiveParam::Bound(binding));
        self
    }

    /// Builder-style binding through a registry path such as
    /// `"TestNamespace.count"`. An unresolvable path leaves the parameter
    /// absent.
    #[must_use]
    pub fn bind_path(self, name: impl Into<String>, registry: &HostRegistry, path: &str) -> Self {
        match registry.binding(path) {
            Some(binding) => self.bind(name, binding),
            None => {
                let name = name.into();
                debug!(param = name.as_str(), path, "binding path did not resolve");
                self
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, param: impl Into<LiveParam>) {
        self.entries.insert(name.into(), param.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LiveParam> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound parameters.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().filter_map(|(name, param)| match param {
            LiveParam::Bound(binding) => Some((name.as_str(), binding)),
            LiveParam::Value(_) => None,
        })
    }

    /// Current values of every parameter. Unset or orphaned bindings are
    /// left out.
    #[must_use]
    pub fn snapshot(&self) -> Params {
        self.entries
            .iter()
            .filter_map(|(name, param)| {
                let value = match param {
                    LiveParam::Value(value) => value.clone(),
                    LiveParam::Bound(binding) => binding.current()?,
                };
                Some((name.clone(), value))
            })
            .collect()
    }
}

enum TranslatorRef {
    Shared(Arc<Translator>),
    Global,
}

impl TranslatorRef {
    fn get(&self) -> &Translator {
        match self {
            Self::Shared(translator) => translator.as_ref(),
            Self::Global => glossa_i18n::global(),
        }
    }
}

/// Observer table entry. The binding is kept so the host identity in the
/// table key cannot be reused while the entry exists.
struct Watch {
    binding: Binding,
    _subscription: Subscription,
}

type WatchKey = (usize, String);

struct LiveInner {
    translator: TranslatorRef,
    key: String,
    params: RefCell<LiveParams>,
    on_change: Box<dyn Fn(&str)>,
    last: RefCell<Option<String>>,
    active: Cell<bool>,
    watches: RefCell<BTreeMap<WatchKey, Watch>>,
}

impl LiveInner {
    /// Re-resolve and deliver if the text changed. Returns whether
    /// `on_change` was called.
    fn refresh(&self) -> bool {
        if !self.active.get() {
            return false;
        }
        let span = info_span!(
            "glossa.live.refresh",
            key = self.key.as_str(),
            delivered = tracing::field::Empty
        );
        let _entered = span.enter();

        let params = self.params.borrow().snapshot();
        let translator = self.translator.get();
        let text = match translator.resolve(&self.key, &params) {
            Ok(text) => text,
            Err(err) => {
                if self.last.borrow().is_some() {
                    warn!(key = self.key.as_str(), error = %err, "live re-resolution failed, keeping previous output");
                    span.record("delivered", false);
                    return false;
                }
                warn!(key = self.key.as_str(), error = %err, "live resolution failed");
                translator.config().missing_text(&self.key)
            }
        };

        if self.last.borrow().as_deref() == Some(text.as_str()) {
            span.record("delivered", false);
            return false;
        }
        *self.last.borrow_mut() = Some(text.clone());
        span.record("delivered", true);
        (self.on_change)(&text);
        true
    }

    fn shutdown(&self) {
        if !self.active.replace(false) {
            return;
        }
        let watches = std::mem::take(&mut *self.watches.borrow_mut());
        let params = std::mem::take(&mut *self.params.borrow_mut());
        debug!(key = self.key.as_str(), watches = watches.len(), "live translation torn down");
        drop(watches);
        drop(params);
    }
}

/// Keep exactly one observer per bound `(host, property)` pair.
fn sync_watches(inner: &Rc<LiveInner>) {
    let wanted: BTreeMap<WatchKey, Binding> = inner
        .params
        .borrow()
        .bindings()
        .filter(|(_, binding)| binding.is_alive())
        .map(|(_, binding)| {
            (
                (binding.source_id(), binding.path().to_owned()),
                binding.clone(),
            )
        })
        .collect();

    let mut watches = inner.watches.borrow_mut();
    watches.retain(|key, watch| wanted.contains_key(key) && watch.binding.is_alive());
    for (key, binding) in wanted {
        if watches.contains_key(&key) {
            continue;
        }
        let weak = Rc::downgrade(inner);
        let callback = Box::new(move |_: Option<&Value>| schedule_refresh(&weak));
        if let Some(subscription) = binding.watch(callback) {
            watches.insert(
                key,
                Watch {
                    binding,
                    _subscription: subscription,
                },
            );
        }
    }
}

/// Run a refresh now, or once at the end of the current batch.
fn schedule_refresh(weak: &Weak<LiveInner>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if !inner.active.get() {
        return;
    }
    let key = Rc::as_ptr(&inner) as *const () as usize;
    let weak = Rc::downgrade(&inner);
    batch::defer_or_run_keyed(key, move || {
        if let Some(inner) = weak.upgrade() {
            inner.refresh();
        }
    });
}

/// A resolution kept up to date with its bound parameters.
///
/// Dropping the handle tears it down; [`teardown`](Self::teardown) is the
/// explicit form.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::sync::Arc;
///
/// use glossa_i18n::{Translations, Translator};
/// use glossa_runtime::{Binding, LiveParams, LiveTranslation, ObservableObject};
///
/// let translator = Arc::new(Translator::new(
///     Translations::new().with("cart", "{{count}} items"),
/// ));
/// let cart = ObservableObject::new("cart").with("count", 3).into_shared();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// let live = LiveTranslation::establish(
///     translator,
///     "cart",
///     LiveParams::new().bind("count", Binding::new(&cart, "count")),
///     move |text| sink.borrow_mut().push(text.to_owned()),
/// );
///
/// cart.set("count", 4);
/// live.teardown();
/// cart.set("count", 5);
/// assert_eq!(*seen.borrow(), ["3 items", "4 items"]);
/// ```
pub struct LiveTranslation {
    inner: Rc<LiveInner>,
}

impl LiveTranslation {
    /// Resolve `key` now, deliver the result to `on_change`, and keep
    /// delivering whenever a bound parameter changes the output.
    pub fn establish(
        translator: Arc<Translator>,
        key: impl Into<String>,
        params: LiveParams,
        on_change: impl Fn(&str) + 'static,
    ) -> Self {
        Self::start(TranslatorRef::Shared(translator), key.into(), params, Box::new(on_change))
    }

    /// Like [`establish`](Self::establish), against the process-wide
    /// translator.
    pub fn establish_global(
        key: impl Into<String>,
        params: LiveParams,
        on_change: impl Fn(&str) + 'static,
    ) -> Self {
        Self::start(TranslatorRef::Global, key.into(), params, Box::new(on_change))
    }

    fn start(
        translator: TranslatorRef,
        key: String,
        params: LiveParams,
        on_change: Box<dyn Fn(&str)>,
    ) -> Self {
        let inner = Rc::new(LiveInner {
            translator,
            key,
            params: RefCell::new(params),
            on_change,
            last: RefCell::new(None),
            active: Cell::new(true),
            watches: RefCell::new(BTreeMap::new()),
        });
        inner.refresh();
        sync_watches(&inner);
        Self { inner }
    }

    /// Replace the parameters after a re-render.
    ///
    /// Observers of `(host, property)` pairs that are still bound are kept,
    /// new pairs are observed, stale ones dropped. Then the output is
    /// re-resolved and delivered if it changed. Returns whether it was
    /// delivered; always `false` once torn down.
    pub fn rebind(&self, params: LiveParams) -> bool {
        if !self.inner.active.get() {
            return false;
        }
        *self.inner.params.borrow_mut() = params;
        sync_watches(&self.inner);
        self.inner.refresh()
    }

    /// Re-resolve now, e.g. after a dictionary swap. Returns whether the
    /// output changed and was delivered.
    pub fn refresh(&self) -> bool {
        self.inner.refresh()
    }

    /// The last delivered text.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner.last.borrow().clone()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Property observers currently held.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.inner.watches.borrow().len()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Stop observing. No `on_change` call starts after this returns.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for LiveTranslation {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl fmt::Debug for LiveTranslation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveTranslation")
            .field("key", &self.inner.key)
            .field("active", &self.inner.active.get())
            .field("watches", &self.watch_count())
            .field("current", &*self.inner.last.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ObservableObject;
    use crate::reactive::BatchScope;
    use glossa_i18n::{PluralCategory, PluralGroup, Translations};
    use tracing_test::traced_test;

    fn translator() -> Arc<Translator> {
        Arc::new(
            Translator::new(
                Translations::new()
                    .with("cart", "{{count}} items")
                    .with("beer", "I like {{name}}")
                    .with("pair", "{{a}} and {{b}}")
                    .with(
                        "fum",
                        PluralGroup::new("{{count}} fums").with(PluralCategory::One, "A fum"),
                    ),
            )
            .with_plural_provider(|_: &str, n: f64| {
                if n == 1.0 {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }),
        )
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |text: &str| sink.borrow_mut().push(text.to_owned()))
    }

    #[test]
    fn fixed_params_deliver_once() {
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish(
            translator(),
            "beer",
            LiveParams::new().with("name", "IPA"),
            on_change,
        );
        assert_eq!(*seen.borrow(), ["I like IPA"]);
        assert_eq!(live.watch_count(), 0);
        assert!(!live.refresh());
        assert_eq!(live.current().as_deref(), Some("I like IPA"));
    }

    #[test]
    fn snapshot_skips_unset_and_orphaned_bindings() {
        let host = ObservableObject::new("view").with("a", 1).into_shared();
        let gone = ObservableObject::new("gone").with("b", 2).into_shared();
        let params = LiveParams::new()
            .bind("a", Binding::new(&host, "a"))
            .bind("b", Binding::new(&gone, "b"))
            .bind("c", Binding::new(&host, "c"))
            .with("d", true);
        drop(gone);

        let snapshot = params.snapshot();
        assert_eq!(snapshot.get("a"), Some(&Value::Int(1)));
        assert_eq!(snapshot.get("b"), None);
        assert_eq!(snapshot.get("c"), None);
        assert_eq!(snapshot.get("d"), Some(&Value::Bool(true)));
        assert_eq!(params.bindings().count(), 3);
    }

    #[test]
    fn same_property_bound_twice_is_observed_once() {
        let host = ObservableObject::new("ns").with("count", 2).into_shared();
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish(
            translator(),
            "pair",
            LiveParams::new()
                .bind("a", Binding::new(&host, "count"))
                .bind("b", Binding::new(&host, "count")),
            on_change,
        );
        assert_eq!(live.watch_count(), 1);
        assert_eq!(host.observer_count("count"), 1);

        host.set("count", 3);
        assert_eq!(*seen.borrow(), ["2 and 2", "3 and 3"]);
    }

    #[test]
    fn rebind_keeps_unchanged_observers() {
        let host = ObservableObject::new("ns").with("count", 3).with("other", 7).into_shared();
        let (seen, on_change) = recorder();
        let params = LiveParams::new().bind("count", Binding::new(&host, "count"));
        let live = LiveTranslation::establish(translator(), "cart", params.clone(), on_change);

        assert!(!live.rebind(params));
        assert_eq!(host.observer_count("count"), 1);

        assert!(live.rebind(LiveParams::new().bind("count", Binding::new(&host, "other"))));
        assert_eq!(host.observer_count("count"), 0);
        assert_eq!(host.observer_count("other"), 1);
        assert_eq!(*seen.borrow(), ["3 items", "7 items"]);
    }

    #[test]
    fn dictionary_swap_is_picked_up_by_refresh() {
        let translator = translator();
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish(
            Arc::clone(&translator),
            "cart",
            LiveParams::new().with("count", 3),
            on_change,
        );
        translator.set_translations(Translations::new().with("cart", "{{count}} Sachen"));
        assert!(live.refresh());
        assert_eq!(*seen.borrow(), ["3 items", "3 Sachen"]);
    }

    #[test]
    fn batch_coalesces_refreshes() {
        let host = ObservableObject::new("ns").with("a", 1).with("b", 2).into_shared();
        let (seen, on_change) = recorder();
        let _live = LiveTranslation::establish(
            translator(),
            "pair",
            LiveParams::new()
                .bind("a", Binding::new(&host, "a"))
                .bind("b", Binding::new(&host, "b")),
            on_change,
        );
        {
            let _batch = BatchScope::new();
            host.set("a", 10);
            host.set("b", 20);
            host.set("a", 11);
        }
        assert_eq!(*seen.borrow(), ["1 and 2", "11 and 20"]);
    }

    #[test]
    fn initial_failure_delivers_fallback_then_recovers() {
        let host = ObservableObject::shared("ns");
        let (seen, on_change) = recorder();
        let _live = LiveTranslation::establish(
            translator(),
            "fum",
            LiveParams::new().bind("count", Binding::new(&host, "count")),
            on_change,
        );
        host.set("count", 1);
        assert_eq!(*seen.borrow(), ["Missing translation: fum", "A fum"]);
    }

    #[test]
    #[traced_test]
    fn failed_refresh_is_logged_and_contained() {
        let host = ObservableObject::new("ns").with("count", 2).into_shared();
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish(
            translator(),
            "fum",
            LiveParams::new().bind("count", Binding::new(&host, "count")),
            on_change,
        );
        host.set("count", "lots");
        assert!(logs_contain("keeping previous output"));
        assert_eq!(live.current().as_deref(), Some("2 fums"));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn teardown_releases_everything() {
        let host = ObservableObject::new("ns").with("count", 3).into_shared();
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish(
            translator(),
            "cart",
            LiveParams::new().bind("count", Binding::new(&host, "count")),
            on_change,
        );
        let inner = Rc::downgrade(&live.inner);
        live.teardown();
        assert!(inner.upgrade().is_none());
        assert_eq!(host.observer_count("count"), 0);
        host.set("count", 4);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn global_translator_is_usable() {
        let (seen, on_change) = recorder();
        let live = LiveTranslation::establish_global(
            "glossa.runtime.test.absent",
            LiveParams::new(),
            on_change,
        );
        assert!(live.is_active());
        assert_eq!(
            *seen.borrow(),
            ["Missing translation: glossa.runtime.test.absent"]
        );
    }

    #[test]
    fn debug_format() {
        let (_, on_change) = recorder();
        let live = LiveTranslation::establish(translator(), "cart", LiveParams::new(), on_change);
        let dbg = format!("{live:?}");
        assert!(dbg.contains("LiveTranslation"));
        assert!(dbg.contains("cart"));
    }
}
