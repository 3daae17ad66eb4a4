//! Check loader - discovers candidates and loads each one in isolation

use crate::manifest::{CheckManifest, DriverTable};
use crate::registry::{Availability, Catalog, CatalogEntry};
use forgecred_core::{CheckDescriptor, CredentialCheck, Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a candidate could not be loaded
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("optional library not installed: {0}")]
    MissingFeature(String),

    #[error("missing required `{0}` contract member")]
    MissingMember(&'static str),

    #[error("unknown driver '{0}'")]
    UnknownDriver(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("schema validation failed: {0}")]
    Schema(#[source] Error),

    #[error("initialization failed: {0:#}")]
    Init(anyhow::Error),

    #[error("loader panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for LoadError {
    fn from(err: anyhow::Error) -> Self {
        LoadError::Init(err)
    }
}

type LoadFn = Box<dyn FnOnce() -> std::result::Result<CheckDescriptor, LoadError> + Send>;

/// One plugin unit found by a source, not yet loaded
pub struct Candidate {
    /// Provisional identifier, used when loading fails
    pub identifier: String,
    pub origin: String,
    load: LoadFn,
}

impl Candidate {
    pub fn new<F>(identifier: impl Into<String>, origin: impl Into<String>, load: F) -> Self
    where
        F: FnOnce() -> std::result::Result<CheckDescriptor, LoadError> + Send + 'static,
    {
        Self {
            identifier: identifier.into(),
            origin: origin.into(),
            load: Box::new(load),
        }
    }

    /// Run the loader, turning a panic into a load failure
    fn load(self) -> (String, String, std::result::Result<CheckDescriptor, LoadError>) {
        let Candidate {
            identifier,
            origin,
            load,
        } = self;
        let result = catch_unwind(AssertUnwindSafe(load))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload.as_ref()))));
        (identifier, origin, result)
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("identifier", &self.identifier)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Somewhere checks can be discovered from
pub trait DiscoverySource: Send + Sync {
    /// Short label for logging
    fn label(&self) -> String;

    /// Enumerate candidates. Fails only when the source itself is unreadable.
    fn candidates(&self) -> Result<Vec<Candidate>>;
}

/// Discover every candidate of a source and load each in isolation.
///
/// A candidate that errors or panics while loading is recorded as unavailable
/// with its reason; it never stops the others from loading.
pub fn discover(source: &dyn DiscoverySource) -> Result<Catalog> {
    info!("Discovering checks from: {}", source.label());
    let mut catalog = Catalog::new();

    for candidate in source.candidates()? {
        let (provisional, origin, result) = candidate.load();

        let entry = match result {
            Ok(descriptor) => {
                debug!("Loaded check: {} from {}", descriptor.identifier(), origin);
                CatalogEntry {
                    identifier: descriptor.identifier().to_string(),
                    description: descriptor.description().to_string(),
                    origin,
                    availability: Availability::Available(Arc::new(descriptor)),
                }
            }
            Err(e) => {
                warn!("Check {} from {} is unavailable: {}", provisional, origin, e);
                unavailable(provisional, origin, e.to_string())
            }
        };

        if let Err(rejected) = catalog.insert(entry) {
            let first = catalog
                .entry(&rejected.identifier)
                .map(|e| e.origin.clone())
                .unwrap_or_default();
            warn!(
                "Duplicate check identifier {} from {} (already loaded from {})",
                rejected.identifier, rejected.origin, first
            );
            // Shadowed candidates stay listed under `id@origin`, then `id@origin#2`, ...
            let key = format!("{}@{}", rejected.identifier, rejected.origin);
            let mut shadow = unavailable(
                key.clone(),
                rejected.origin,
                format!(
                    "duplicate identifier '{}' (already loaded from {})",
                    rejected.identifier, first
                ),
            );
            let mut n = 1;
            while let Err(taken) = catalog.insert(shadow) {
                n += 1;
                shadow = taken;
                shadow.identifier = format!("{}#{}", key, n);
            }
        }
    }

    info!(
        "Discovered {} checks ({} available)",
        catalog.len(),
        catalog.available().count()
    );
    Ok(catalog)
}

fn unavailable(identifier: String, origin: String, reason: String) -> CatalogEntry {
    CatalogEntry {
        identifier,
        description: String::new(),
        origin,
        availability: Availability::Unavailable { reason },
    }
}

type Constructor =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn CredentialCheck>, LoadError> + Send + Sync>;

/// Compiled-in checks
#[derive(Clone, Default)]
pub struct StaticSource {
    label: String,
    constructors: Vec<(String, Constructor)>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            constructors: Vec::new(),
        }
    }

    /// Register a fallible constructor
    pub fn with<F>(mut self, id: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> std::result::Result<Arc<dyn CredentialCheck>, LoadError> + Send + Sync + 'static,
    {
        self.constructors.push((id.into(), Arc::new(constructor)));
        self
    }

    /// Register a check type with an infallible constructor
    pub fn with_check<C, F>(self, id: impl Into<String>, constructor: F) -> Self
    where
        C: CredentialCheck + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.with(id, move || {
            Ok(Arc::new(constructor()) as Arc<dyn CredentialCheck>)
        })
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl DiscoverySource for StaticSource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .constructors
            .iter()
            .map(|(id, constructor)| {
                let id = id.clone();
                let constructor = Arc::clone(constructor);
                let check_id = id.clone();
                Candidate::new(id, self.label.clone(), move || {
                    let check = constructor()?;
                    CheckDescriptor::new(check_id, check).map_err(LoadError::Schema)
                })
            })
            .collect())
    }
}

/// Directory of YAML manifests, searched recursively in sorted order
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    drivers: DriverTable,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, drivers: DriverTable) -> Self {
        Self {
            dir: dir.into(),
            drivers,
        }
    }

    fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect(&path, out)?;
            } else if let Some(ext) = path.extension() {
                if ext == "yaml" || ext == "yml" {
                    out.push(path);
                }
            }
        }
        Ok(())
    }
}

impl DiscoverySource for DirectorySource {
    fn label(&self) -> String {
        self.dir.display().to_string()
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        if !self.dir.is_dir() {
            return Err(Error::FileNotFound {
                path: self.dir.display().to_string(),
            });
        }

        let mut paths = Vec::new();
        Self::collect(&self.dir, &mut paths)?;
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let origin = path.display().to_string();
                let drivers = self.drivers.clone();
                let fallback = stem.clone();
                Candidate::new(stem, origin, move || load_manifest(&path, &fallback, &drivers))
            })
            .collect())
    }
}

fn load_manifest(
    path: &Path,
    fallback_id: &str,
    drivers: &DriverTable,
) -> std::result::Result<CheckDescriptor, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadError::InvalidManifest(format!("cannot read: {}", e)))?;
    let manifest = CheckManifest::from_yaml(&content)
        .map_err(|e| LoadError::InvalidManifest(e.to_string()))?;
    manifest.build(fallback_id, drivers)
}

/// Several sources discovered as one, in order
#[derive(Default)]
pub struct CompositeSource {
    sources: Vec<Box<dyn DiscoverySource>>,
}

impl CompositeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl DiscoverySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl DiscoverySource for CompositeSource {
    fn label(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut all = Vec::new();
        for source in &self.sources {
            all.extend(source.candidates()?);
        }
        Ok(all)
    }
}

/// Load all manifests from a directory
pub fn load_checks_from_dir(dir: impl AsRef<Path>, drivers: &DriverTable) -> Result<Catalog> {
    discover(&DirectorySource::new(dir.as_ref(), drivers.clone()))
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
