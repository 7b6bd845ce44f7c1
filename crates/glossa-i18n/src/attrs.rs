#![forbid(unsafe_code)]

//! Attribute translation helpers for view layers.
//!
//! Results are plain strings; markup escaping belongs to the renderer.

use crate::translator::Translator;
use crate::value::Params;

impl Translator {
    /// Translate `(attribute, key)` pairs into `(attribute, text)` pairs,
    /// preserving order. Never fails.
    #[must_use]
    pub fn translate_attrs<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Vec<(String, String)> {
        let params = Params::new();
        pairs
            .into_iter()
            .map(|(attr, key)| (attr.to_owned(), self.t(key, &params)))
            .collect()
    }

    /// Translate every property named `<attr><suffix>` into `attr`.
    ///
    /// With the default suffix, `("titleTranslation", "foo.bar")` becomes
    /// `("title", "A Foobar")`. Properties without the suffix, or consisting
    /// of the suffix alone, are skipped.
    #[must_use]
    pub fn translatable_attributes<'a>(
        &self,
        props: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Vec<(String, String)> {
        let suffix = self.config().attribute_suffix.as_str();
        self.translate_attrs(props.into_iter().filter_map(|(name, key)| {
            name.strip_suffix(suffix)
                .filter(|attr| !attr.is_empty())
                .map(|attr| (attr, key))
        }))
    }
}
