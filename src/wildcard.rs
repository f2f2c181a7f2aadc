//! Wildcard resolution.
//!
//! Generators never read wildcard files themselves; they ask a
//! [`WildcardProvider`] for the values behind a name. Values may contain
//! template syntax of their own, which the generators re-parse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::grammar::WILDCARD_DELIMITER;
use crate::utils::Result;

/// Source of wildcard values
pub trait WildcardProvider: Send + Sync + fmt::Debug {
    /// All values for `name`, in order. Unknown names yield an empty list.
    fn get_all_values(&self, name: &str) -> Vec<String>;
}

/// Strip one leading and one trailing `__` from a wildcard name.
pub fn normalize_wildcard_name(name: &str) -> &str {
    let name = name.strip_prefix(WILDCARD_DELIMITER).unwrap_or(name);
    name.strip_suffix(WILDCARD_DELIMITER).unwrap_or(name)
}

/// Look up a wildcard, warning when it resolves to nothing.
pub fn resolve_wildcard(provider: &dyn WildcardProvider, name: &str) -> Vec<String> {
    let name = normalize_wildcard_name(name);
    let values = provider.get_all_values(name);
    if values.is_empty() {
        warn!(wildcard = name, "wildcard has no values");
    }
    values
}

/// In-memory provider mapping names to ordered values.
///
/// Deserializes from a plain JSON object:
///
/// ```json
/// { "colours": ["red", "green", "blue"], "animals/pets": ["cat", "dog"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WildcardMap {
    values: BTreeMap<String, Vec<String>>,
}

impl WildcardMap {
    pub fn new() -> Self {
        WildcardMap::default()
    }

    /// Add or replace the values for a wildcard
    pub fn insert<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.insert(
            normalize_wildcard_name(name).to_string(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let map: WildcardMap = serde_json::from_str(json)?;
        // keys written as "__name__" are looked up without delimiters
        Ok(map
            .values
            .into_iter()
            .fold(WildcardMap::new(), |acc, (name, values)| acc.insert(&name, values)))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Wildcard names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl WildcardProvider for WildcardMap {
    fn get_all_values(&self, name: &str) -> Vec<String> {
        self.values.get(name).cloned().unwrap_or_default()
    }
}
