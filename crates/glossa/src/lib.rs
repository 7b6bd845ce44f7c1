#![forbid(unsafe_code)]

//! Glossa public facade crate.
//!
//! Re-exports the resolution pipeline from `glossa-i18n` and, with the
//! default `runtime` feature, live translations from `glossa-runtime`.
//!
//! ```
//! use glossa::prelude::*;
//!
//! let translator = Translator::new(
//!     Translations::new().with("foo.bar.named", "A Foobar named {{name}}"),
//! );
//! let text = translator.t("foo.bar.named", &Params::new().with("name", "Sue"));
//! assert_eq!(text, "A Foobar named Sue");
//! ```

// --- Resolution re-exports -------------------------------------------------

pub use glossa_i18n::{
    I18nConfig, I18nError, Interpolated, Namespace, OtherOnly, Params, PluralCategory, PluralGroup,
    PluralProvider, ResolvedOutput, Result, TranslationEntry, TranslationStore, Translations,
    Translator, Value, global, interpolate, placeholders,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use glossa_runtime::{
    BatchScope, Binding, HostRegistry, LiveParam, LiveParams, LiveTranslation, Observable,
    ObservableObject, PropertySource, Subscription,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        I18nConfig, I18nError, Params, PluralCategory, PluralGroup, Translations, Translator,
        Value,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{BatchScope, Binding, HostRegistry, LiveParams, LiveTranslation, ObservableObject};

    pub use crate::i18n;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use glossa_i18n as i18n;
#[cfg(feature = "runtime")]
pub use glossa_runtime as runtime;
