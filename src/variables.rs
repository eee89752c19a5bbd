use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{\{\s*([\w.-]+)\s*\}\}").expect("valid regex"))
}

/// Resolves `${{ name }}` references in user-supplied values (git URLs,
/// remote credentials) against the project's variables.
#[derive(Debug, Clone, Default)]
pub struct ProjectVariables {
    values: HashMap<String, String>,
}

impl ProjectVariables {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn extend(&mut self, more: impl IntoIterator<Item = (String, String)>) {
        self.values.extend(more);
    }

    /// Substitutes every reference; an undefined name is an error.
    pub fn replace_occurrences(&self, input: &str) -> Result<String> {
        let mut missing = None;
        let replaced = placeholder().replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.values.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(Error::UnknownVariable(name)),
            None => Ok(replaced.into_owned()),
        }
    }
}
