//! Actor-facing message templates.
//!
//! Templates use `{name}` placeholders. Unknown placeholders are left
//! untouched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// `{source}`, `{applied}`, `{items}`, `{rejected}`, `{unresolved}`
    pub summary: String,
    /// `{source}`
    pub nothing_to_organize: String,
    /// `{error}`
    pub failed: String,
    /// `{count}`
    pub audit_warning: String,
    pub no_staging_containers: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            summary: "Organized {source}: {applied} moves ({items} items), {rejected} rejected, {unresolved} unresolved."
                .to_string(),
            nothing_to_organize: "Nothing to organize in {source}.".to_string(),
            failed: "Could not organize: {error}. 0 moves, 0 rejected, 0 unresolved.".to_string(),
            audit_warning: "Audit log unavailable for {count} record(s); moves were kept."
                .to_string(),
            no_staging_containers: "You have no staging containers to organize.".to_string(),
        }
    }
}

/// Substitute `{key}` placeholders in `template`.
pub fn render(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
