//! Check catalog - index of every discovered check

use forgecred_core::{CheckDescriptor, CheckSchema, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether a discovered check can be invoked
#[derive(Debug, Clone)]
pub enum Availability {
    /// Loaded and its schema validated
    Available(Arc<CheckDescriptor>),
    /// Listed but not invocable
    Unavailable { reason: String },
}

/// One catalog row
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub identifier: String,
    /// Description of the target service; empty when the check failed to load
    /// before it could describe itself
    pub description: String,
    /// Where the check came from (manifest path, `builtin`, ...)
    pub origin: String,
    pub availability: Availability,
}

impl CatalogEntry {
    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Available(_))
    }

    pub fn descriptor(&self) -> Option<&Arc<CheckDescriptor>> {
        match &self.availability {
            Availability::Available(descriptor) => Some(descriptor),
            Availability::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.availability {
            Availability::Available(_) => None,
            Availability::Unavailable { reason } => Some(reason),
        }
    }
}

/// Comparable snapshot of a catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub identifier: String,
    pub available: bool,
    pub reason: Option<String>,
    pub schema: Option<CheckSchema>,
}

/// Catalog of discovered checks.
///
/// Built once by discovery and never mutated afterwards, so it can be shared
/// behind an `Arc` and read concurrently without locking.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns the rejected entry when the identifier is taken
    pub(crate) fn insert(&mut self, entry: CatalogEntry) -> std::result::Result<(), CatalogEntry> {
        if self.entries.contains_key(&entry.identifier) {
            return Err(entry);
        }
        self.entries.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    /// Get an invocable check by identifier
    pub fn get(&self, id: &str) -> Result<Arc<CheckDescriptor>> {
        let entry = self.entries.get(id).ok_or_else(|| Error::CheckNotFound {
            check_id: id.to_string(),
        })?;
        match &entry.availability {
            Availability::Available(descriptor) => Ok(Arc::clone(descriptor)),
            Availability::Unavailable { reason } => Err(Error::CheckUnavailable {
                check_id: id.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// Get a catalog row, available or not
    pub fn entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// Field schema of an invocable check
    pub fn schema(&self, id: &str) -> Result<CheckSchema> {
        self.get(id).map(|d| d.schema().clone())
    }

    /// All entries, sorted by identifier
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn available(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(|e| e.is_available())
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(|e| !e.is_available())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers, availability, reasons and schemas, for comparing catalogs
    pub fn summary(&self) -> Vec<EntrySummary> {
        self.entries
            .values()
            .map(|e| EntrySummary {
                identifier: e.identifier.clone(),
                available: e.is_available(),
                reason: e.unavailable_reason().map(str::to_string),
                schema: e.descriptor().map(|d| d.schema().clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forgecred_core::{AuthResult, CredentialCheck, FieldSpec, InputSet, Verdict};

    struct TestCheck;

    #[async_trait]
    impl CredentialCheck for TestCheck {
        fn describe(&self) -> CheckSchema {
            CheckSchema::new("Test service").field(FieldSpec::text("host"))
        }

        async fn authenticate(&self, _inputs: &InputSet) -> AuthResult {
            Ok(Verdict::failure("Invalid credentials"))
        }
    }

    fn available(id: &str) -> CatalogEntry {
        let descriptor = CheckDescriptor::new(id, Arc::new(TestCheck)).unwrap();
        CatalogEntry {
            identifier: id.to_string(),
            description: descriptor.description().to_string(),
            origin: "test".into(),
            availability: Availability::Available(Arc::new(descriptor)),
        }
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = Catalog::new();
        catalog.insert(available("TEST-001")).unwrap();
        catalog
            .insert(CatalogEntry {
                identifier: "TEST-002".into(),
                description: String::new(),
                origin: "test".into(),
                availability: Availability::Unavailable {
                    reason: "optional library not installed: vendor-sdk".into(),
                },
            })
            .unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("TEST-001").is_ok());
        assert_eq!(catalog.schema("TEST-001").unwrap().fields.len(), 1);

        let err = catalog.get("TEST-002").unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, Error::CheckUnavailable { .. }));

        let err = catalog.get("INVALID").unwrap_err();
        assert!(matches!(err, Error::CheckNotFound { .. }));

        assert_eq!(catalog.available().count(), 1);
        assert_eq!(catalog.unavailable().count(), 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut catalog = Catalog::new();
        catalog.insert(available("dup")).unwrap();
        let rejected = catalog.insert(available("dup")).unwrap_err();
        assert_eq!(rejected.identifier, "dup");
        assert_eq!(catalog.len(), 1);
    }
}
