//! Resolved inputs handed to a check

use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Raw, possibly partial caller input
pub type RawInputs = BTreeMap<String, Value>;

/// Complete set of inputs for one invocation.
///
/// Produced fresh by [`crate::resolve`] for every invocation; it holds a value for
/// every non-note field of the schema plus any extra keys the caller passed.
#[derive(Clone, Default, PartialEq)]
pub struct InputSet {
    values: BTreeMap<String, Value>,
    secrets: BTreeSet<String>,
}

impl InputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Insert a value that must be redacted from debug output
    pub fn insert_secret(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.secrets.insert(name.clone());
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Text content of a field, trimmed; empty for missing or non-text values
    pub fn text(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("")
    }

    /// Text content, or `None` when blank
    pub fn opt_text(&self, name: &str) -> Option<&str> {
        Some(self.text(name)).filter(|s| !s.is_empty())
    }

    /// Boolean content of a field; missing or unparsable values are false
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::to_flag)
            .unwrap_or(false)
    }

    /// Parse a field's textual form
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        match self.values.get(name)? {
            Value::Text(s) => s.trim().parse().ok(),
            other => other.to_string().parse().ok(),
        }
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over names and values in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for InputSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.values {
            if self.secrets.contains(name) && !value.is_blank() {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}
