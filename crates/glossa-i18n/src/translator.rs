#![forbid(unsafe_code)]

//! The resolution pipeline: lookup, plural selection, interpolation, and
//! missing-key fallback.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Key absent, or names a namespace | Fallback text with the key, warning logged |
//! | Missing count | Plural key without `count` | `I18nError::MissingCount` |
//! | Non-numeric count | `count` not a number | `I18nError::NonNumericCount` |
//! | Malformed group | Plural group without `other` | `I18nError::MalformedPluralGroup` |
//! | Unknown placeholder | No matching parameter | Left verbatim |

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::{debug, error, warn};

use crate::config::I18nConfig;
use crate::error::{I18nError, Result};
use crate::interpolate::interpolate_tracked;
use crate::plural::{OtherOnly, PluralProvider, select_variant};
use crate::store::{TranslationEntry, TranslationStore, Translations};
use crate::value::Params;

/// A resolved string and the parameters its template actually used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub text: String,
    pub consumed: BTreeSet<String>,
    /// Whether `text` is the missing-key fallback.
    pub missing: bool,
}

/// Holder that lets a `dyn PluralProvider` live behind an `ArcSwap`.
struct ProviderSlot(Box<dyn PluralProvider>);

/// Resolves translation keys against a swappable dictionary.
///
/// `Translator` is `Send + Sync`. Every resolution reads one dictionary
/// snapshot, so a concurrent [`set_translations`](Self::set_translations)
/// is seen entirely or not at all.
///
/// # Example
///
/// ```
/// use glossa_i18n::{Params, PluralCategory, PluralGroup, Translations, Translator};
///
/// let translator = Translator::new(
///     Translations::new()
///         .with("greeting", "Hello, {{name}}!")
///         .with("items", PluralGroup::new("{{count}} items").with(PluralCategory::One, "one item")),
/// )
/// .with_plural_provider(|_: &str, n: f64| {
///     if n == 1.0 { PluralCategory::One } else { PluralCategory::Other }
/// });
///
/// let hello = translator.resolve("greeting", &Params::new().with("name", "Sue"));
/// assert_eq!(hello.unwrap(), "Hello, Sue!");
/// assert_eq!(translator.resolve("items", &Params::new().with("count", 1)).unwrap(), "one item");
/// assert_eq!(translator.resolve("items", &Params::new().with("count", 4)).unwrap(), "4 items");
/// assert_eq!(translator.resolve("nope", &Params::new()).unwrap(), "Missing translation: nope");
/// ```
pub struct Translator {
    config: I18nConfig,
    store: TranslationStore,
    provider: ArcSwap<ProviderSlot>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::with_config(I18nConfig::default(), Translations::default())
    }
}

impl Translator {
    /// Create a translator with the default configuration.
    #[must_use]
    pub fn new(translations: Translations) -> Self {
        Self::with_config(I18nConfig::default(), translations)
    }

    /// Create a translator with an explicit configuration.
    ///
    /// Plural groups render their `other` variant until a provider is
    /// installed.
    #[must_use]
    pub fn with_config(config: I18nConfig, translations: Translations) -> Self {
        Self {
            config,
            store: TranslationStore::new(translations),
            provider: ArcSwap::from_pointee(ProviderSlot(Box::new(OtherOnly))),
        }
    }

    /// Builder-style provider installation.
    #[must_use]
    pub fn with_plural_provider(self, provider: impl PluralProvider + 'static) -> Self {
        self.set_plural_provider(provider);
        self
    }

    /// Atomically replace the locale-rule provider.
    pub fn set_plural_provider(&self, provider: impl PluralProvider + 'static) {
        self.provider
            .store(Arc::new(ProviderSlot(Box::new(provider))));
    }

    #[must_use]
    pub fn config(&self) -> &I18nConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    /// Atomically replace the whole dictionary. Returns the previous one.
    pub fn set_translations(&self, translations: Translations) -> Arc<Translations> {
        self.store.replace(translations)
    }

    /// The locale plural rules are evaluated in: the dictionary's declared
    /// locale, else the configured default.
    #[must_use]
    pub fn active_locale(&self) -> String {
        let snapshot = self.store.snapshot();
        self.locale_of(&snapshot).to_owned()
    }

    fn locale_of<'a>(&'a self, translations: &'a Translations) -> &'a str {
        translations
            .locale()
            .unwrap_or(self.config.default_locale.as_str())
    }

    /// Resolve `key` with `params` into display text.
    ///
    /// A missing key is not an error: it yields the configured fallback
    /// text containing the key.
    pub fn resolve(&self, key: &str, params: &Params) -> Result<String> {
        self.resolve_output(key, params).map(|out| out.text)
    }

    /// Resolve and also report which parameters were consumed.
    pub fn resolve_output(&self, key: &str, params: &Params) -> Result<ResolvedOutput> {
        let snapshot = self.store.snapshot();
        let locale = self.locale_of(&snapshot);

        let template = match snapshot.lookup(key) {
            Some(TranslationEntry::Literal(text)) => text.as_str(),
            Some(TranslationEntry::Plural(group)) => {
                let count = self.count_of(key, params)?;
                let provider = self.provider.load();
                select_variant(group, count, locale, provider.0.as_ref(), key)?
            }
            Some(TranslationEntry::Namespace(_)) | None => {
                if self.config.warn_on_missing {
                    warn!(key, locale, "missing translation");
                }
                return Ok(ResolvedOutput {
                    text: self.config.missing_text(key),
                    consumed: BTreeSet::new(),
                    missing: true,
                });
            }
        };

        let interpolated = interpolate_tracked(template, params);
        debug!(key, locale, consumed = interpolated.consumed.len(), "translation resolved");
        Ok(ResolvedOutput {
            text: interpolated.text,
            consumed: interpolated.consumed,
            missing: false,
        })
    }

    /// Lenient resolution for display paths that must not fail.
    ///
    /// Configuration errors are logged and rendered as the missing-key
    /// fallback.
    #[must_use]
    pub fn t(&self, key: &str, params: &Params) -> String {
        self.resolve(key, params).unwrap_or_else(|err| {
            error!(key, error = %err, "translation failed");
            self.config.missing_text(key)
        })
    }

    fn count_of(&self, key: &str, params: &Params) -> Result<f64> {
        let value = params
            .get(&self.config.count_param)
            .ok_or_else(|| I18nError::MissingCount {
                key: key.to_owned(),
            })?;
        value.as_count().ok_or_else(|| I18nError::NonNumericCount {
            key: key.to_owned(),
            value: value.to_string(),
        })
    }
}

/// The process-wide translator.
///
/// Initialized on first use with the default configuration and an empty
/// dictionary; install strings with [`Translator::set_translations`].
pub fn global() -> &'static Translator {
    static GLOBAL: OnceLock<Translator> = OnceLock::new();
    GLOBAL.get_or_init(Translator::default)
}
