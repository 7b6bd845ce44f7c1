#![forbid(unsafe_code)]

//! Plural categories and variant selection.
//!
//! The resolver never encodes a language's grammar. It asks a
//! [`PluralProvider`] for the CLDR category of a count and picks the
//! matching variant from a [`PluralGroup`], falling back to `other`.
//!
//! # Invariants
//!
//! 1. Counts reach the provider unchanged, including negative and
//!    fractional values.
//! 2. A category without an explicit variant resolves to `other`.
//! 3. A group without `other` is a configuration error, never a silent
//!    empty string.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{I18nError, Result};

/// CLDR plural categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// Every category, in CLDR order.
    pub const ALL: [Self; 6] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Few,
        Self::Many,
        Self::Other,
    ];

    /// The lowercase tag used in dictionaries (`"zero"`, `"one"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }

    /// Parse a dictionary tag. Returns `None` for anything outside the
    /// closed set.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == tag)
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown plural category '{s}'"))
    }
}

/// Source of locale plural rules.
///
/// Implementations must be total: when a count cannot be classified they
/// return [`PluralCategory::Other`] themselves.
pub trait PluralProvider: Send + Sync {
    fn category(&self, locale: &str, count: f64) -> PluralCategory;
}

impl<F> PluralProvider for F
where
    F: Fn(&str, f64) -> PluralCategory + Send + Sync,
{
    fn category(&self, locale: &str, count: f64) -> PluralCategory {
        self(locale, count)
    }
}

/// Provider that classifies every count as `other`.
///
/// Used when no locale rules are installed; plural groups then always
/// render their `other` variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtherOnly;

impl PluralProvider for OtherOnly {
    fn category(&self, _locale: &str, _count: f64) -> PluralCategory {
        PluralCategory::Other
    }
}

/// Plural variants keyed by category.
///
/// A well-formed group always carries `other`; [`PluralGroup::new`]
/// enforces that, while [`PluralGroup::from_variants`] accepts whatever a
/// dictionary declared so the defect can be reported at resolution time
/// for that key alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluralGroup {
    variants: BTreeMap<PluralCategory, String>,
}

impl PluralGroup {
    /// Create a group with the mandatory `other` variant.
    #[must_use]
    pub fn new(other: impl Into<String>) -> Self {
        let mut variants = BTreeMap::new();
        variants.insert(PluralCategory::Other, other.into());
        Self { variants }
    }

    /// Builder-style variant insert.
    #[must_use]
    pub fn with(mut self, category: PluralCategory, text: impl Into<String>) -> Self {
        self.variants.insert(category, text.into());
        self
    }

    /// Build from raw variants without checking for `other`.
    pub fn from_variants<S: Into<String>>(
        variants: impl IntoIterator<Item = (PluralCategory, S)>,
    ) -> Self {
        Self {
            variants: variants.into_iter().map(|(c, s)| (c, s.into())).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, category: PluralCategory) -> Option<&str> {
        self.variants.get(&category).map(String::as_str)
    }

    /// Whether the mandatory `other` variant is present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.variants.contains_key(&PluralCategory::Other)
    }

    pub fn categories(&self) -> impl Iterator<Item = PluralCategory> + '_ {
        self.variants.keys().copied()
    }

    /// Pick the variant for `category`, falling back to `other`.
    ///
    /// A group without `other` is rejected for every category. `key` only
    /// labels the error.
    pub fn select(&self, category: PluralCategory, key: &str) -> Result<&str> {
        let malformed = || I18nError::MalformedPluralGroup {
            key: key.to_owned(),
        };
        let other = self.get(PluralCategory::Other).ok_or_else(malformed)?;
        Ok(self.get(category).unwrap_or(other))
    }
}

/// Select the variant of `group` for `count` in `locale`.
///
/// The category comes entirely from `provider`.
pub fn select_variant<'g>(
    group: &'g PluralGroup,
    count: f64,
    locale: &str,
    provider: &dyn PluralProvider,
    key: &str,
) -> Result<&'g str> {
    let category = provider.category(locale, count);
    group.select(category, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Zero/one/other grammar, as used by Colognian.
    fn ksh(_locale: &str, count: f64) -> PluralCategory {
        if count == 0.0 {
            PluralCategory::Zero
        } else if count == 1.0 {
            PluralCategory::One
        } else {
            PluralCategory::Other
        }
    }

    fn foos() -> PluralGroup {
        PluralGroup::new("All {{count}} Foos")
            .with(PluralCategory::Zero, "No Foos")
            .with(PluralCategory::One, "One Foo")
    }

    #[test]
    fn tags_round_trip_through_parse() {
        for category in PluralCategory::ALL {
            assert_eq!(category.as_str().parse::<PluralCategory>(), Ok(category));
        }
        assert!("several".parse::<PluralCategory>().is_err());
        assert_eq!(PluralCategory::from_tag("Other"), None);
    }

    #[test]
    fn selects_explicit_variant() {
        let group = foos();
        assert_eq!(select_variant(&group, 0.0, "ksh", &ksh, "foos"), Ok("No Foos"));
        assert_eq!(select_variant(&group, 1.0, "ksh", &ksh, "foos"), Ok("One Foo"));
        assert_eq!(
            select_variant(&group, 21.0, "ksh", &ksh, "foos"),
            Ok("All {{count}} Foos")
        );
    }

    #[test]
    fn missing_category_falls_back_to_other() {
        let group = PluralGroup::new("{{count}} fums").with(PluralCategory::One, "A fum");
        assert_eq!(select_variant(&group, 0.0, "ksh", &ksh, "fum"), Ok("{{count}} fums"));
    }

    #[test]
    fn group_without_other_is_an_error() {
        let group = PluralGroup::from_variants([(PluralCategory::One, "A fum")]);
        assert!(!group.is_well_formed());
        for count in [0.0, 1.0, 2.0] {
            assert_eq!(
                select_variant(&group, count, "ksh", &ksh, "fum"),
                Err(I18nError::MalformedPluralGroup { key: "fum".into() }),
                "count {count}"
            );
        }
    }

    #[test]
    fn counts_reach_the_provider_unchanged() {
        let seen = Mutex::new(Vec::new());
        let recorder = |locale: &str, count: f64| {
            seen.lock().expect("seen lock").push((locale.to_owned(), count));
            PluralCategory::Other
        };
        let group = foos();
        for count in [-1.0, 0.5, 1e9] {
            let _ = select_variant(&group, count, "pl", &recorder, "foos");
        }
        assert_eq!(
            *seen.lock().expect("seen lock"),
            vec![
                ("pl".to_string(), -1.0),
                ("pl".to_string(), 0.5),
                ("pl".to_string(), 1e9)
            ]
        );
    }

    #[test]
    fn other_only_provider() {
        assert_eq!(OtherOnly.category("en", 1.0), PluralCategory::Other);
        assert_eq!(select_variant(&foos(), 1.0, "en", &OtherOnly, "foos"), Ok("All {{count}} Foos"));
    }
}
