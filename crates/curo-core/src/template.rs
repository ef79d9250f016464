// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template rendering.
//!
//! Substitutes named variables into a message body. Both `{{key}}` and
//! `{key}` placeholder syntaxes are accepted and key matching is
//! case-insensitive. Unknown placeholders are left verbatim in the output;
//! this is a deliberate contract so that a typo in a template surfaces in
//! the delivered text instead of silently vanishing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

// Double-brace alternative first so `{{key}}` is never consumed as `{key}`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}|\{\s*([A-Za-z0-9_]+)\s*\}")
        .expect("placeholder regex is valid")
});

/// Render `template`, substituting each placeholder with its variable value.
///
/// Pure and total: never fails, never allocates beyond the output string.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    if template.is_empty() || !template.contains('{') {
        return template.to_string();
    }

    let lowered: HashMap<String, &str> = vars
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match lowered.get(&key.to_lowercase()) {
                Some(value) => (*value).to_string(),
                // Unknown placeholder: keep the original text untouched.
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
