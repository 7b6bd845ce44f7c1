#![forbid(unsafe_code)]

//! Translation tree and the process-wide store that holds it.
//!
//! # Lookup
//!
//! A key path is split on `.` and walked through [`Namespace`] nodes.
//! At every namespace the whole remaining path is tried first as a flat
//! key, so `"foo.bar"` and `"foo.bar.named"` may both live at the root
//! next to nested namespaces. Failing that, the first segment must name a
//! child namespace; any other miss is `None` immediately.
//!
//! # Swapping
//!
//! [`TranslationStore`] keeps an immutable [`Translations`] snapshot
//! behind an `ArcSwap`. Replacement is one atomic pointer store, and a
//! reader holding a snapshot keeps seeing exactly that dictionary.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::plural::PluralGroup;

/// A node in the translation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationEntry {
    /// A plain string, possibly containing placeholders.
    Literal(String),
    /// Plural variants keyed by category.
    Plural(PluralGroup),
    /// Nested keys.
    Namespace(Namespace),
}

impl TranslationEntry {
    /// Whether this entry can be resolved to text (not a namespace).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Namespace(_))
    }
}

impl From<&str> for TranslationEntry {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_owned())
    }
}

impl From<String> for TranslationEntry {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<PluralGroup> for TranslationEntry {
    fn from(group: PluralGroup) -> Self {
        Self::Plural(group)
    }
}

impl From<Namespace> for TranslationEntry {
    fn from(ns: Namespace) -> Self {
        Self::Namespace(ns)
    }
}

/// A mapping from key (segment or flat dotted key) to entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    entries: BTreeMap<String, TranslationEntry>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<TranslationEntry>) -> Self {
        self.insert(key, entry);
        self
    }

    /// Insert an entry under `key`. Dots in `key` are kept verbatim, which
    /// makes it a flat key.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<TranslationEntry>) {
        self.entries.insert(key.into(), entry.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TranslationEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TranslationEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Walk `segments` from this namespace.
    fn walk(&self, segments: &[&str]) -> Option<&TranslationEntry> {
        let (first, rest) = segments.split_first()?;
        if rest.is_empty() {
            return self.entries.get(*first);
        }
        if let Some(entry) = self.entries.get(&segments.join(".")) {
            return Some(entry);
        }
        match self.entries.get(*first)? {
            TranslationEntry::Namespace(child) => child.walk(rest),
            _ => None,
        }
    }

    /// Terminal entries as `(full key, entry)`, sorted by key.
    fn collect_terminals<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a TranslationEntry)>) {
        for (key, entry) in &self.entries {
            let full = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match entry {
                TranslationEntry::Namespace(child) => child.collect_terminals(&full, out),
                _ => out.push((full, entry)),
            }
        }
    }
}

/// An immutable translation dictionary, optionally tagged with a locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations {
    locale: Option<String>,
    root: Namespace,
}

impl Translations {
    /// An empty dictionary without a declared locale.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing root namespace.
    #[must_use]
    pub fn from_root(root: Namespace) -> Self {
        Self { locale: None, root }
    }

    /// Declare the locale these strings are written in.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Builder-style insert at the root.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<TranslationEntry>) -> Self {
        self.root.insert(key, entry);
        self
    }

    /// Insert at the root. A dotted `key` is stored as a flat key.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<TranslationEntry>) {
        self.root.insert(key, entry);
    }

    pub(crate) fn set_locale(&mut self, locale: Option<String>) {
        self.locale = locale;
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    #[must_use]
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Resolve a dotted key path. Returns the entry even when it is a
    /// namespace; callers decide whether that counts as found.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&TranslationEntry> {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        self.root.walk(&segments)
    }

    /// Every resolvable key with its entry, sorted by key.
    #[must_use]
    pub fn terminals(&self) -> Vec<(String, &TranslationEntry)> {
        let mut out = Vec::new();
        self.root.collect_terminals("", &mut out);
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Keys of plural groups that lack the mandatory `other` variant.
    #[must_use]
    pub fn malformed_plural_keys(&self) -> Vec<String> {
        self.terminals()
            .into_iter()
            .filter_map(|(key, entry)| match entry {
                TranslationEntry::Plural(group) if !group.is_well_formed() => Some(key),
                _ => None,
            })
            .collect()
    }
}

/// Process-wide holder of the active [`Translations`].
///
/// Readers call [`snapshot`](Self::snapshot) once per resolution and work
/// on that `Arc`; a concurrent [`replace`](Self::replace) never affects a
/// snapshot already taken.
#[derive(Debug)]
pub struct TranslationStore {
    current: ArcSwap<Translations>,
}

impl Default for TranslationStore {
    fn default() -> Self {
        Self::new(Translations::default())
    }
}

impl TranslationStore {
    #[must_use]
    pub fn new(translations: Translations) -> Self {
        Self {
            current: ArcSwap::from_pointee(translations),
        }
    }

    /// The current dictionary.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Translations> {
        self.current.load_full()
    }

    /// Atomically replace the whole dictionary. Returns the previous one.
    pub fn replace(&self, translations: Translations) -> Arc<Translations> {
        debug!(
            entries = translations.root().len(),
            locale = translations.locale().unwrap_or(""),
            "translation store swapped"
        );
        self.current.swap(Arc::new(translations))
    }

    /// Look up `key` in the current dictionary.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<TranslationEntry> {
        self.current.load().lookup(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plural::PluralCategory;
    use std::sync::Barrier;
    use std::thread;

    fn sample() -> Translations {
        Translations::new()
            .with("foo.bar", "A Foobar")
            .with("foo.bar.named", "A Foobar named {{name}}")
            .with("baz", Namespace::new().with("qux", "A qux appears"))
            .with(
                "fum",
                PluralGroup::new("{{count}} fums").with(PluralCategory::One, "A fum"),
            )
            .with(
                "deep",
                Namespace::new().with("er", Namespace::new().with("still", "bottom")),
            )
    }

    #[test]
    fn flat_dotted_keys_resolve() {
        let t = sample();
        assert_eq!(t.lookup("foo.bar"), Some(&TranslationEntry::from("A Foobar")));
        assert_eq!(
            t.lookup("foo.bar.named"),
            Some(&TranslationEntry::from("A Foobar named {{name}}"))
        );
    }

    #[test]
    fn nested_namespaces_resolve() {
        let t = sample();
        assert_eq!(t.lookup("baz.qux"), Some(&TranslationEntry::from("A qux appears")));
        assert_eq!(t.lookup("deep.er.still"), Some(&TranslationEntry::from("bottom")));
    }

    #[test]
    fn namespace_is_returned_but_not_terminal() {
        let t = sample();
        let entry = t.lookup("baz").expect("namespace present");
        assert!(!entry.is_terminal());
    }

    #[test]
    fn segment_miss_is_not_found() {
        let t = sample();
        assert_eq!(t.lookup("nothing.here"), None);
        assert_eq!(t.lookup("baz.missing"), None);
        // No partial-match fallback through a literal.
        assert_eq!(t.lookup("baz.qux.more"), None);
        assert_eq!(t.lookup("fum.one"), None);
    }

    #[test]
    fn empty_segments_are_not_found() {
        let t = sample();
        assert_eq!(t.lookup(""), None);
        assert_eq!(t.lookup("baz..qux"), None);
        assert_eq!(t.lookup(".baz"), None);
        assert_eq!(t.lookup("baz."), None);
    }

    #[test]
    fn terminals_are_sorted_full_keys() {
        let keys: Vec<String> = sample().terminals().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["baz.qux", "deep.er.still", "foo.bar", "foo.bar.named", "fum"]
        );
    }

    #[test]
    fn malformed_groups_are_listed() {
        let t = sample().with(
            "broken",
            PluralGroup::from_variants([(PluralCategory::One, "just one")]),
        );
        assert_eq!(t.malformed_plural_keys(), vec!["broken".to_string()]);
    }

    #[test]
    fn replace_is_visible_to_later_lookups() {
        let store = TranslationStore::new(sample());
        assert!(store.lookup("foo.bar").is_some());

        let old = store.replace(Translations::new().with("only", "new"));
        assert!(old.lookup("foo.bar").is_some());
        assert_eq!(store.lookup("foo.bar"), None);
        assert_eq!(store.lookup("only"), Some(TranslationEntry::from("new")));
    }

    #[test]
    fn snapshot_survives_a_swap() {
        let store = TranslationStore::new(sample());
        let snap = store.snapshot();
        store.replace(Translations::new());
        assert_eq!(snap.lookup("baz.qux"), Some(&TranslationEntry::from("A qux appears")));
        assert_eq!(store.lookup("baz.qux"), None);
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_dictionary() {
        // Generation `n` holds `a` and `b` both equal to n; a torn read
        // would pair values from different generations.
        fn generation(n: u32) -> Translations {
            Translations::new()
                .with("a", n.to_string())
                .with("b", n.to_string())
        }

        let store = Arc::new(TranslationStore::new(generation(0)));
        let barrier = Arc::new(Barrier::new(5));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..2_000 {
                        let snap = store.snapshot();
                        assert_eq!(snap.lookup("a"), snap.lookup("b"));
                    }
                })
            })
            .collect();

        barrier.wait();
        for n in 1..=500 {
            store.replace(generation(n));
        }
        for reader in readers {
            reader.join().expect("reader thread panicked");
        }
    }
}
