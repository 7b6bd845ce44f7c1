#![forbid(unsafe_code)]

//! Translation resolution for Glossa.
//!
//! Turns a dotted translation key plus named parameters into display text:
//! nested key lookup, CLDR plural-category selection, `{{name}}`
//! interpolation, and a visible fallback for missing keys.
//!
//! # Role in Glossa
//! `glossa-i18n` is the pure, thread-safe half of the system. It knows
//! nothing about observable properties; `glossa-runtime` builds live,
//! self-updating translations on top of [`Translator::resolve`].
//!
//! # How it fits in the system
//! A [`Translator`] owns a [`TranslationStore`] (an atomically swappable
//! [`Translations`] snapshot) and a [`PluralProvider`] supplied by the
//! host. Locale grammar lives entirely in that provider.

pub mod attrs;
pub mod config;
pub mod error;
pub mod interpolate;
pub mod loader;
pub mod plural;
pub mod store;
pub mod translator;
pub mod value;

pub use config::I18nConfig;
pub use error::{I18nError, Result};
pub use interpolate::{Interpolated, interpolate, interpolate_tracked, placeholders};
pub use plural::{OtherOnly, PluralCategory, PluralGroup, PluralProvider, select_variant};
pub use store::{Namespace, TranslationEntry, TranslationStore, Translations};
pub use translator::{ResolvedOutput, Translator, global};
pub use value::{Params, Value};
