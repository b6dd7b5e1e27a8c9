use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*(?:\|([^}]*))?\}\}")
        .expect("placeholder pattern is valid")
});

/// Render `{{name}}` / `{{name|fallback}}` placeholders from `values`.
/// Returns the first placeholder name with neither a value nor a fallback.
pub(crate) fn render(
    template: &str,
    values: &BTreeMap<String, String>,
) -> Result<String, String> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (values.get(name), caps.get(2)) {
            (Some(value), _) => value.clone(),
            (None, Some(fallback)) => fallback.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(name),
        None => Ok(rendered.into_owned()),
    }
}
