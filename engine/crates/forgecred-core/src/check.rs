//! Check contract and descriptors - the interface all credential checks implement

use crate::error::{Error, Result};
use crate::field::{validate_schema, FieldSpec};
use crate::inputs::{InputSet, RawInputs};
use crate::resolve::resolve;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Result of a single authentication attempt, before normalization
pub type AuthResult = anyhow::Result<Verdict>;

/// The trait that all credential checks must implement
///
/// Checks hold no state shared between invocations. Every network call a check
/// makes must carry a finite timeout.
#[async_trait]
pub trait CredentialCheck: Send + Sync {
    /// Human-readable description and the input fields, in display order
    fn describe(&self) -> CheckSchema;

    /// Attempt to authenticate with the given inputs.
    ///
    /// `Ok(Verdict)` with `success == true` only when the identity-proving call
    /// actually completed. Errors are turned into failed outcomes by the caller.
    async fn authenticate(&self, inputs: &InputSet) -> AuthResult;
}

/// Static description of a check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSchema {
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl CheckSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Names of fields flagged as required, in display order
    pub fn required_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// What a check reports: success flag plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    pub message: String,
}

impl Verdict {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// A verdict must always say what happened
    pub fn is_well_formed(&self) -> bool {
        !self.message.trim().is_empty()
    }
}

impl From<(bool, String)> for Verdict {
    fn from((success, message): (bool, String)) -> Self {
        Self { success, message }
    }
}

/// Immutable metadata plus entry point of a loaded check
pub struct CheckDescriptor {
    identifier: String,
    schema: CheckSchema,
    check: Arc<dyn CredentialCheck>,
}

impl CheckDescriptor {
    /// Build a descriptor from the check's own `describe()`
    pub fn new(identifier: impl Into<String>, check: Arc<dyn CredentialCheck>) -> Result<Self> {
        let schema = check.describe();
        Self::with_schema(identifier, schema, check)
    }

    /// Build a descriptor with a schema supplied from elsewhere (e.g. a manifest)
    pub fn with_schema(
        identifier: impl Into<String>,
        schema: CheckSchema,
        check: Arc<dyn CredentialCheck>,
    ) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(Error::config("check identifier must not be empty"));
        }
        if schema.description.trim().is_empty() {
            return Err(Error::config(format!(
                "check '{}' has an empty description",
                identifier
            )));
        }
        validate_schema(&schema.fields)?;

        Ok(Self {
            identifier,
            schema,
            check,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn description(&self) -> &str {
        &self.schema.description
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.schema.fields
    }

    pub fn schema(&self) -> &CheckSchema {
        &self.schema
    }

    /// Resolve raw input into a fresh `InputSet` for this check
    pub fn resolve(&self, raw: &RawInputs) -> Result<InputSet> {
        resolve(&self.schema.fields, raw)
    }

    /// Call the check directly, without any isolation
    pub async fn invoke(&self, inputs: &InputSet) -> AuthResult {
        self.check.authenticate(inputs).await
    }

    /// Shared handle to the underlying check
    pub fn check(&self) -> Arc<dyn CredentialCheck> {
        Arc::clone(&self.check)
    }
}

impl fmt::Debug for CheckDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDescriptor")
            .field("identifier", &self.identifier)
            .field("schema", &self.schema)
            .field("check", &"...")
            .finish()
    }
}
