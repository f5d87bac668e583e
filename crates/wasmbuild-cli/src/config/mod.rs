//! Project manifest (`wasmbuild.yaml`) loading.
//!
//! The manifest is optional in content but must exist on disk. It carries two
//! keys, both optional:
//!
//! ```yaml
//! vars:
//!   TITLE: My App
//!   HEADER: <h1>${USER}'s app</h1>
//! assets:
//!   - static
//!   - style.css
//! ```
//!
//! `vars` feed the bootstrap page template after environment expansion, and
//! `assets` name files or directories (relative to the source root) that are
//! served, copied into the build output and watched.

mod defaults;
mod loading;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub use defaults::*;
pub use loading::resolve_manifest;

/// Decoded project manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Template variables, expanded against the environment before rendering
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,

    /// Asset paths, relative to the source root unless absolute
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,
}

impl Manifest {
    /// Render the manifest back to a YAML document.
    ///
    /// The output uses the JSON flow style with every character YAML does
    /// not admit verbatim written as a `\uXXXX` escape, so
    /// `parse(render(m)) == m` for any manifest.
    pub fn render(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(escape_for_yaml(&json))
    }

    /// Vars with `$NAME` and `${NAME}` references replaced from the process
    /// environment. Unset variables expand to the empty string.
    pub fn expanded_vars(&self) -> BTreeMap<String, String> {
        self.expanded_vars_with(|name| std::env::var(name).ok())
    }

    /// Like [`Manifest::expanded_vars`] but resolving names through `lookup`.
    pub fn expanded_vars_with<F>(&self, lookup: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.vars
            .iter()
            .map(|(key, value)| {
                let expanded =
                    shellexpand::env_with_context_no_errors(value, |name: &str| {
                        Some(lookup(name).unwrap_or_default())
                    });
                (key.clone(), expanded.into_owned())
            })
            .collect()
    }
}

/// JSON leaves DEL, the C1 controls, the Unicode line breaks and a few
/// noncharacters unescaped. A YAML reader rejects the controls outright and
/// folds the line breaks inside quoted scalars.
fn escape_for_yaml(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if admitted_verbatim(c) {
            out.push(c);
        } else {
            let _ = write!(out, "\\u{:04x}", c as u32);
        }
    }
    out
}

fn admitted_verbatim(c: char) -> bool {
    let printable = matches!(
        c,
        '\t' | '\n' | '\r'
            | ' '..='~'
            | '\u{a0}'..='\u{d7ff}'
            | '\u{e000}'..='\u{fffd}'
            | '\u{10000}'..='\u{10ffff}'
    );
    printable && !matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}
