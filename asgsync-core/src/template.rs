//! Minimal `{{ variable }}` substitution for cloud-init templates.
//!
//! This is not a Jinja engine. Only bare `{{ name }}` placeholders are
//! substituted; `{% ... %}` blocks, filters such as `{{ name | upper }}`
//! and expressions are copied through verbatim. Templates relying on those
//! are passed on unrendered, with a warning logged.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Jinja syntax this module leaves alone: block tags and filtered variables.
static UNSUPPORTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{%.*?%\}|\{\{[^}]*\|[^}]*\}\}").expect("jinja pattern is valid")
});

/// Jinja constructs in `template` that `render` will not evaluate.
pub fn unsupported_constructs(template: &str) -> Vec<&str> {
    UNSUPPORTED.find_iter(template).map(|m| m.as_str()).collect()
}

/// Replaces every `{{ name }}` whose name is in `vars`.
///
/// Placeholders for unknown names are left untouched so templates that
/// cloud-init renders itself on first boot survive.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let unsupported = unsupported_constructs(template);
    if let Some(first) = unsupported.first() {
        warn!(
            count = unsupported.len(),
            first = %first,
            "template uses Jinja syntax that is copied through unrendered"
        );
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                debug!(name = &caps[1], "leaving unknown template variable");
                caps[0].to_string()
            }
        })
        .into_owned()
}
