#![forbid(unsafe_code)]

//! Single-pass `{{name}}` placeholder substitution.
//!
//! # Invariants
//!
//! 1. **Single pass**: substituted values are copied verbatim and never
//!    re-scanned, so a value containing `{{x}}` stays literal.
//! 2. **Non-failing**: a placeholder without a matching parameter is left
//!    in the output exactly as written.
//! 3. **Identity**: text with no well-formed placeholder is returned
//!    unchanged.
//!
//! # Syntax
//!
//! A placeholder is `{{` + identifier + `}}` where the identifier is an
//! ASCII letter or `_` followed by ASCII letters, digits, or `_`. Anything
//! else between braces (spaces, dots, an empty name) is plain text.

use std::collections::BTreeSet;

use crate::value::Params;

/// Result of an interpolation together with the parameters it used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpolated {
    pub text: String,
    /// Names of parameters substituted at least once.
    pub consumed: BTreeSet<String>,
}

/// Substitute `{{name}}` placeholders from `params`.
#[must_use]
pub fn interpolate(template: &str, params: &Params) -> String {
    interpolate_tracked(template, params).text
}

/// Like [`interpolate`], also reporting which parameters were consumed.
#[must_use]
pub fn interpolate_tracked(template: &str, params: &Params) -> Interpolated {
    let mut out = Interpolated {
        text: String::with_capacity(template.len()),
        consumed: BTreeSet::new(),
    };
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.text.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            out.text.push_str(&rest[open..]);
            return out;
        };
        let name = &after_open[..close];

        if is_identifier(name) {
            if let Some(value) = params.get(name) {
                out.text.push_str(&value.to_string());
                out.consumed.insert(name.to_owned());
            } else {
                out.text.push_str(&rest[open..open + 2 + close + 2]);
            }
            rest = &after_open[close + 2..];
        } else {
            // Emit one brace and rescan, so `{{{name}}}` still finds the
            // inner placeholder.
            out.text.push('{');
            rest = &rest[open + 1..];
        }
    }

    out.text.push_str(rest);
    out
}

/// Placeholder names appearing in `template`, in order of first use.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let name = &after_open[..close];
        if is_identifier(name) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
            rest = &after_open[close + 2..];
        } else {
            rest = &rest[open + 1..];
        }
    }
    names
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
