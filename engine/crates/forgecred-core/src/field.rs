//! Declarative field schema - the inputs a check asks its caller for

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind of input a field represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Short free text (hostnames, usernames, ports)
    Text,
    /// Text that must never be echoed or logged in plaintext
    Secret,
    /// Checkbox
    Bool,
    /// One value out of `options`
    Select,
    /// Path to a local file (certificates, key files)
    File,
    /// Display-only note, never part of the inputs
    Note,
}

impl FieldKind {
    /// Empty value used when neither the caller nor the schema supplies one
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Bool => Value::Bool(false),
            _ => Value::Text(String::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Secret => "secret",
            FieldKind::Bool => "bool",
            FieldKind::Select => "select",
            FieldKind::File => "file",
            FieldKind::Note => "note",
        }
    }
}

/// A dependent default: the value of a boolean field picks this field's default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the controlling boolean field
    pub field: String,
    /// Default when the controlling field resolves to true
    pub when_true: Value,
    /// Default when the controlling field resolves to false
    pub when_false: Value,
}

/// Describes one input of a check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Key into the input mapping
    pub name: String,

    pub kind: FieldKind,

    /// Label shown by a renderer; falls back to the name
    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Choices for `select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Whether a renderer should mark the field mandatory
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(default, rename = "controlled_by", skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl FieldSpec {
    /// Create a new field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            default: None,
            options: Vec::new(),
            required: false,
            help: None,
            dependency: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn secret(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Secret)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::File)
    }

    pub fn select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldKind::Select);
        field.options = options.into_iter().map(Into::into).collect();
        field
    }

    pub fn note(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldKind::Note);
        field.label = text.into();
        field
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Make this field's default follow a boolean field
    pub fn controlled_by(
        mut self,
        field: impl Into<String>,
        when_true: impl Into<Value>,
        when_false: impl Into<Value>,
    ) -> Self {
        self.dependency = Some(Dependency {
            field: field.into(),
            when_true: when_true.into(),
            when_false: when_false.into(),
        });
        self
    }

    pub fn is_secret(&self) -> bool {
        self.kind == FieldKind::Secret
    }

    /// Label for display, never empty
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// Validate a field list at load time.
///
/// Rejects duplicate names, dependencies on unknown, non-boolean or note fields,
/// self-references, chained dependencies and `select` fields without a usable
/// default. Dependencies are one hop only, so rejecting chains also rules out cycles.
pub fn validate_schema(fields: &[FieldSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(Error::field("<unnamed>", "field name must not be empty"));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::field(&field.name, "duplicate field name"));
        }
    }

    let by_name: HashMap<&str, &FieldSpec> =
        fields.iter().map(|f| (f.name.as_str(), f)).collect();

    for field in fields {
        if field.kind == FieldKind::Select {
            if field.options.is_empty() {
                return Err(Error::field(&field.name, "select field has no options"));
            }
            if let Some(default) = &field.default {
                let in_options = default
                    .as_str()
                    .map(|d| field.options.iter().any(|o| o == d))
                    .unwrap_or(false);
                if !in_options {
                    return Err(Error::field(
                        &field.name,
                        format!("default '{}' is not one of the options", default),
                    ));
                }
            }
        }

        let Some(dep) = &field.dependency else {
            continue;
        };

        if field.kind == FieldKind::Note {
            return Err(Error::field(&field.name, "note fields cannot have a dependency"));
        }
        if dep.field == field.name {
            return Err(Error::field(&field.name, "field depends on itself"));
        }
        let source = by_name.get(dep.field.as_str()).ok_or_else(|| {
            Error::field(
                &field.name,
                format!("depends on unknown field '{}'", dep.field),
            )
        })?;
        if source.kind != FieldKind::Bool {
            return Err(Error::field(
                &field.name,
                format!(
                    "controlling field '{}' must be bool, found {}",
                    dep.field,
                    source.kind.as_str()
                ),
            ));
        }
        if source.dependency.is_some() {
            return Err(Error::field(
                &field.name,
                format!(
                    "controlling field '{}' has a dependency of its own",
                    dep.field
                ),
            ));
        }
    }

    Ok(())
}
