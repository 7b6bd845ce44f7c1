#![forbid(unsafe_code)]

//! Error taxonomy for translation resolution.
//!
//! Only genuine misconfiguration is an error. A missing key degrades to
//! fallback text and an unknown placeholder is left verbatim; neither
//! ever reaches this type.

/// Errors from i18n operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum I18nError {
    /// A plural-shaped key was resolved without a `count` parameter.
    #[error("translation '{key}' is pluralized and requires a count parameter")]
    MissingCount { key: String },
    /// The `count` parameter is present but cannot be read as a number.
    #[error("count '{value}' for translation '{key}' is not numeric")]
    NonNumericCount { key: String, value: String },
    /// A plural group has no `other` variant to fall back to.
    #[error("plural group '{key}' has no 'other' variant")]
    MalformedPluralGroup { key: String },
    /// A dictionary source could not be turned into translations.
    #[error("invalid dictionary: {0}")]
    InvalidDictionary(String),
    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Standard result type for glossa-i18n APIs.
pub type Result<T> = std::result::Result<T, I18nError>;
