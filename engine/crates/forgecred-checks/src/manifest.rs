//! YAML check manifests and the driver table they refer to
//!
//! A manifest binds an identifier to a compiled-in driver and may override the
//! driver's description and field schema:
//!
//! ```yaml
//! id: intranet-wiki
//! driver: http-basic
//! description: "Intranet wiki (HTTP Basic)"
//! settings:
//!   method: HEAD
//! ```

use crate::loader::LoadError;
use forgecred_core::{CheckDescriptor, CredentialCheck, FieldSpec, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Static driver settings from a manifest
pub type DriverSettings = BTreeMap<String, Value>;

/// Constructor for a driver
pub type DriverFactory = fn(&DriverSettings) -> anyhow::Result<Arc<dyn CredentialCheck>>;

/// A check defined in YAML format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckManifest {
    /// Catalog identifier; defaults to the file stem
    #[serde(default)]
    pub id: Option<String>,
    /// Name of the driver in the `DriverTable`
    #[serde(default)]
    pub driver: Option<String>,
    /// Overrides the driver's description
    #[serde(default)]
    pub description: Option<String>,
    /// Overrides the driver's field schema
    #[serde(default)]
    pub fields: Option<Vec<FieldSpec>>,
    /// Passed to the driver constructor
    #[serde(default)]
    pub settings: DriverSettings,
}

impl CheckManifest {
    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Construct the driver and build a validated descriptor
    pub fn build(
        &self,
        fallback_id: &str,
        drivers: &DriverTable,
    ) -> Result<CheckDescriptor, LoadError> {
        let driver = self
            .driver
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(LoadError::MissingMember("driver"))?;

        let check = drivers.construct(driver, &self.settings)?;

        let mut schema = check.describe();
        if let Some(description) = &self.description {
            schema.description = description.clone();
        }
        if let Some(fields) = &self.fields {
            schema.fields = fields.clone();
        }

        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(fallback_id);

        CheckDescriptor::with_schema(id, schema, check).map_err(LoadError::Schema)
    }
}

#[derive(Clone)]
enum DriverSlot {
    Ready(DriverFactory),
    /// Known driver whose cargo feature was not compiled in
    Missing { feature: &'static str },
}

/// Name -> constructor table for drivers manifests can refer to
#[derive(Clone, Default)]
pub struct DriverTable {
    drivers: BTreeMap<String, DriverSlot>,
}

impl DriverTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver constructor
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) {
        self.drivers.insert(name.into(), DriverSlot::Ready(factory));
    }

    /// Register a known driver that needs a feature this build lacks
    pub fn register_missing(&mut self, name: impl Into<String>, feature: &'static str) {
        self.drivers
            .insert(name.into(), DriverSlot::Missing { feature });
    }

    /// Names of every known driver, including missing ones
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(|s| s.as_str())
    }

    pub fn is_ready(&self, name: &str) -> bool {
        matches!(self.drivers.get(name), Some(DriverSlot::Ready(_)))
    }

    /// Construct a driver instance
    pub fn construct(
        &self,
        name: &str,
        settings: &DriverSettings,
    ) -> Result<Arc<dyn CredentialCheck>, LoadError> {
        match self.drivers.get(name) {
            Some(DriverSlot::Ready(factory)) => factory(settings).map_err(LoadError::Init),
            Some(DriverSlot::Missing { feature }) => Err(LoadError::MissingFeature(format!(
                "driver '{}' requires the '{}' feature",
                name, feature
            ))),
            None => Err(LoadError::UnknownDriver(name.to_string())),
        }
    }
}

impl std::fmt::Debug for DriverTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.drivers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forgecred_core::{AuthResult, CheckSchema, FieldKind, InputSet, Verdict};

    struct StubCheck {
        banner: String,
    }

    #[async_trait]
    impl CredentialCheck for StubCheck {
        fn describe(&self) -> CheckSchema {
            CheckSchema::new("Stub service").field(FieldSpec::text("host").required())
        }

        async fn authenticate(&self, _inputs: &InputSet) -> AuthResult {
            Ok(Verdict::failure(self.banner.clone()))
        }
    }

    fn stub_factory(settings: &DriverSettings) -> anyhow::Result<Arc<dyn CredentialCheck>> {
        let banner = settings
            .get("banner")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "stub".to_string());
        Ok(Arc::new(StubCheck { banner }))
    }

    fn table() -> DriverTable {
        let mut drivers = DriverTable::new();
        drivers.register("stub", stub_factory);
        drivers.register_missing("oracle", "oracle");
        drivers
    }

    #[test]
    fn test_parse_manifest() {
        let yaml = r#"
id: "ACME-DB"
driver: stub
description: "ACME database login"
fields:
  - name: host
    kind: text
    required: true
  - name: use_tls
    kind: bool
    default: true
  - name: port
    kind: text
    controlled_by:
      field: use_tls
      when_true: "6380"
      when_false: "6379"
settings:
  banner: "hello"
"#;

        let manifest = CheckManifest::from_yaml(yaml).unwrap();
        let descriptor = manifest.build("acme-db", &table()).unwrap();
        assert_eq!(descriptor.identifier(), "ACME-DB");
        assert_eq!(descriptor.description(), "ACME database login");
        assert_eq!(descriptor.fields().len(), 3);
        assert_eq!(descriptor.fields()[1].kind, FieldKind::Bool);
    }

    #[test]
    fn test_driver_schema_used_without_overrides() {
        let manifest = CheckManifest::from_yaml("driver: stub").unwrap();
        let descriptor = manifest.build("from-stem", &table()).unwrap();
        assert_eq!(descriptor.identifier(), "from-stem");
        assert_eq!(descriptor.description(), "Stub service");
    }

    #[test]
    fn test_missing_driver_member() {
        let manifest = CheckManifest::from_yaml("id: x\ndescription: no driver").unwrap();
        let err = manifest.build("x", &table()).unwrap_err();
        assert!(matches!(err, LoadError::MissingMember("driver")));
    }

    #[test]
    fn test_missing_and_unknown_drivers() {
        let missing = CheckManifest::from_yaml("driver: oracle").unwrap();
        let err = missing.build("ora", &table()).unwrap_err();
        assert!(err.to_string().starts_with("optional library not installed"));

        let unknown = CheckManifest::from_yaml("driver: telnet").unwrap();
        let err = unknown.build("telnet", &table()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownDriver(ref d) if d == "telnet"));
    }

    #[test]
    fn test_bad_schema_override() {
        let yaml = r#"
driver: stub
fields:
  - name: port
    kind: text
    controlled_by: { field: tls, when_true: "443", when_false: "80" }
"#;
        let manifest = CheckManifest::from_yaml(yaml).unwrap();
        let err = manifest.build("bad", &table()).unwrap_err();
        assert!(err.to_string().starts_with("schema validation failed"));
    }
}
