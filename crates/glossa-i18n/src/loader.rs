#![forbid(unsafe_code)]

//! Building [`Translations`] from an untyped nested mapping.
//!
//! Dictionaries usually arrive as nested JSON objects:
//!
//! ```json
//! {
//!   "@locale": "ksh",
//!   "foo.bar": "A Foobar",
//!   "foos.zero": "No Foos",
//!   "foos.one": "One Foo",
//!   "foos.other": "All {{count}} Foos",
//!   "baz": { "qux": "A qux appears" },
//!   "fum": { "one": "A fum", "other": "{{count}} fums" }
//! }
//! ```
//!
//! | Shape | Becomes |
//! |-------|---------|
//! | string | `Literal` |
//! | object whose keys are all plural tags | `Plural` |
//! | any other object | `Namespace` |
//! | anything else | `InvalidDictionary` error |
//!
//! Sibling flat keys `X.<tag>` that include `X.other` additionally
//! produce a plural group at `X`, unless `X` is defined explicitly.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use tracing::warn;

use crate::error::{I18nError, Result};
use crate::plural::{PluralCategory, PluralGroup};
use crate::store::{Namespace, TranslationEntry, Translations};

/// Reserved top-level key naming the dictionary's locale.
pub const LOCALE_KEY: &str = "@locale";

impl Translations {
    /// Parse a JSON document into translations.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let json: Json = serde_json::from_str(s)
            .map_err(|e| I18nError::InvalidDictionary(format!("JSON parse error: {e}")))?;
        Self::from_json_value(&json)
    }

    /// Convert an already-parsed JSON value into translations.
    ///
    /// The top level must be an object. Plural groups without `other` are
    /// accepted with a warning; resolving such a key fails on its own
    /// without affecting the rest of the dictionary.
    pub fn from_json_value(json: &Json) -> Result<Self> {
        let Json::Object(map) = json else {
            return Err(I18nError::InvalidDictionary(
                "top level must be an object".into(),
            ));
        };

        let locale = match map.get(LOCALE_KEY) {
            None => None,
            Some(Json::String(locale)) => Some(locale.clone()),
            Some(_) => {
                return Err(I18nError::InvalidDictionary(format!(
                    "'{LOCALE_KEY}' must be a string"
                )));
            }
        };

        let mut translations =
            Self::from_root(namespace_from_map(map, "", |k| k == LOCALE_KEY)?);
        translations.set_locale(locale);

        for key in translations.malformed_plural_keys() {
            warn!(key = key.as_str(), "plural group has no 'other' variant");
        }
        Ok(translations)
    }
}

fn namespace_from_map(
    map: &Map<String, Json>,
    path: &str,
    skip: impl Fn(&str) -> bool,
) -> Result<Namespace> {
    let mut ns = Namespace::new();
    for (key, value) in map {
        if skip(key) {
            continue;
        }
        let full = join(path, key);
        ns.insert(key.clone(), entry_from_json(value, &full)?);
    }
    synthesize_flat_plurals(&mut ns);
    Ok(ns)
}

fn entry_from_json(value: &Json, path: &str) -> Result<TranslationEntry> {
    match value {
        Json::String(text) => Ok(TranslationEntry::Literal(text.clone())),
        Json::Object(map) if is_plural_shaped(map) => {
            let mut variants = Vec::with_capacity(map.len());
            for (tag, text) in map {
                let Json::String(text) = text else {
                    return Err(I18nError::InvalidDictionary(format!(
                        "plural variant '{}' must be a string",
                        join(path, tag)
                    )));
                };
                if let Some(category) = PluralCategory::from_tag(tag) {
                    variants.push((category, text.clone()));
                }
            }
            Ok(TranslationEntry::Plural(PluralGroup::from_variants(variants)))
        }
        Json::Object(map) => Ok(TranslationEntry::Namespace(namespace_from_map(
            map,
            path,
            |_| false,
        )?)),
        other => Err(I18nError::InvalidDictionary(format!(
            "'{path}' must be a string or an object, found {}",
            json_kind(other)
        ))),
    }
}

fn is_plural_shaped(map: &Map<String, Json>) -> bool {
    !map.is_empty() && map.keys().all(|k| PluralCategory::from_tag(k).is_some())
}

/// Group `X.zero` .. `X.other` literals into a plural group at `X`.
fn synthesize_flat_plurals(ns: &mut Namespace) {
    let mut groups: BTreeMap<String, Vec<(PluralCategory, String)>> = BTreeMap::new();
    for (key, entry) in ns.iter() {
        let TranslationEntry::Literal(text) = entry else {
            continue;
        };
        let Some((stem, tag)) = key.rsplit_once('.') else {
            continue;
        };
        if let Some(category) = PluralCategory::from_tag(tag) {
            groups
                .entry(stem.to_owned())
                .or_default()
                .push((category, text.clone()));
        }
    }

    for (stem, variants) in groups {
        let has_other = variants.iter().any(|(c, _)| *c == PluralCategory::Other);
        if has_other && !stem.is_empty() && !ns.contains_key(&stem) {
            ns.insert(stem, PluralGroup::from_variants(variants));
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
