use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use regex::{Captures, Regex, RegexBuilder};
use serde_json::Value;

use crate::tracking::config::EventTemplate;
use crate::tracking::error::{invalid_argument, TrackingResult};
use crate::tracking::logger::LOGGER;

/// Token text (for example `{user}`) mapped to the value substituted at dispatch time.
pub type PlaceholderMap = BTreeMap<String, Value>;

/// Parses the JSON object carried by a `data-track-params` attribute.
pub fn parse_placeholder_map(raw: &str) -> TrackingResult<PlaceholderMap> {
    serde_json::from_str::<PlaceholderMap>(raw)
        .map_err(|err| invalid_argument(format!("invalid placeholder parameters `{raw}`: {err}")))
}

/// Returns a fresh copy of `template` with every placeholder token replaced.
///
/// Tokens are matched case-insensitively and every occurrence is replaced. Only string fields
/// are rewritten; other values are copied through. Tokens without an entry stay as they are.
/// When several tokens differ only by case, the first in byte order wins (`{USER}` before
/// `{user}`) and a warning is logged. The template itself is never modified.
pub fn replace_placeholders(
    template: &EventTemplate,
    placeholders: Option<&PlaceholderMap>,
) -> EventTemplate {
    let Some(replacer) = placeholders.and_then(PlaceholderReplacer::new) else {
        return template.clone();
    };

    template
        .iter()
        .map(|(field, value)| {
            let value = match value {
                Value::String(text) => Value::String(replacer.replace(text)),
                other => other.clone(),
            };
            (field.clone(), value)
        })
        .collect()
}

struct PlaceholderReplacer {
    pattern: Regex,
    // keyed by lowercased token
    replacements: HashMap<String, String>,
}

impl PlaceholderReplacer {
    fn new(placeholders: &PlaceholderMap) -> Option<Self> {
        let mut tokens: Vec<&str> = placeholders
            .keys()
            .map(String::as_str)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return None;
        }

        // Longest first so a token that prefixes another never shadows it.
        tokens.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = tokens
            .iter()
            .map(|token| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = match RegexBuilder::new(&alternation).case_insensitive(true).build() {
            Ok(pattern) => pattern,
            Err(err) => {
                LOGGER.warn(format!("placeholder pattern rejected, skipping substitution: {err}"));
                return None;
            }
        };

        let mut replacements = HashMap::with_capacity(placeholders.len());
        for (token, value) in placeholders {
            if token.is_empty() {
                continue;
            }
            match replacements.entry(token.to_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(replacement_text(value));
                }
                Entry::Occupied(slot) => LOGGER.warn(format!(
                    "placeholder `{token}` only differs by case from an earlier token, keeping `{}`",
                    slot.get()
                )),
            }
        }

        Some(Self {
            pattern,
            replacements,
        })
    }

    fn replace(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |captures: &Captures<'_>| {
                let matched = &captures[0];
                self.replacements
                    .get(&matched.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}

fn replacement_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
