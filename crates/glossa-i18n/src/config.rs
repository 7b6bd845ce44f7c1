#![forbid(unsafe_code)]

//! Translator configuration.
//!
//! ```toml
//! default_locale = "de"
//! missing_prefix = "??? "
//! count_param = "n"
//! ```
//!
//! Every field has a default, so a partial document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::error::{I18nError, Result};

/// Tunables for a [`Translator`](crate::Translator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Locale used when the active dictionary does not declare one.
    pub default_locale: String,
    /// Fallback text for a missing key is this prefix followed by the key.
    pub missing_prefix: String,
    /// Parameter that drives plural selection.
    pub count_param: String,
    /// Log a warning for every missing key.
    pub warn_on_missing: bool,
    /// Property-name suffix marking a translatable attribute
    /// (`titleTranslation` translates into `title`).
    pub attribute_suffix: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".into(),
            missing_prefix: "Missing translation: ".into(),
            count_param: "count".into(),
            warn_on_missing: true,
            attribute_suffix: "Translation".into(),
        }
    }
}

impl I18nConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str::<Self>(s)
            .map_err(|e| I18nError::Config(format!("TOML parse error: {e}")))?
            .validated()
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str::<Self>(s)
            .map_err(|e| I18nError::Config(format!("JSON parse error: {e}")))?
            .validated()
    }

    /// Check every field. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.default_locale.trim().is_empty() {
            errors.push("default_locale must not be empty".to_string());
        }
        if self.missing_prefix.is_empty() {
            errors.push("missing_prefix must not be empty".to_string());
        }
        if self.count_param.trim().is_empty() {
            errors.push("count_param must not be empty".to_string());
        }
        if self.attribute_suffix.is_empty() {
            errors.push("attribute_suffix must not be empty".to_string());
        }
        errors
    }

    /// Return `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(I18nError::Config(errors.join("; ")))
        }
    }

    /// Fallback text shown for a missing `key`.
    #[must_use]
    pub fn missing_text(&self, key: &str) -> String {
        format!("{}{key}", self.missing_prefix)
    }
}
