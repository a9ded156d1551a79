// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! User-facing text lookup.

/// Host localisation hook: message key plus named parameters → display text.
pub trait Translator {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// Fallback translator: the key itself with `{name}` placeholders filled in.
///
/// Keys with no placeholders are returned verbatim, so unconfigured hosts
/// still get readable (if English-only) status texts when keys are phrases.
#[derive(Debug, Default, Copy, Clone)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        params.iter().fold(key.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}

impl<F> Translator for F
where
    F: Fn(&str, &[(&str, &str)]) -> String,
{
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        self(key, params)
    }
}
