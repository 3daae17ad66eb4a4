//! ForgeCred Checks - Check catalog, YAML manifests, loader and safe invocation
//!
//! This crate provides:
//! - `Catalog`: Every discovered check, marked available or unavailable
//! - Discovery sources (compiled-in checks, manifest directories) and an
//!   isolating loader
//! - `Invoker`: Runs one check and always hands back a well-formed `Outcome`
//! - Built-in reference checks (`tcp-connect`, `http-basic`)

pub mod builtin;
pub mod loader;
pub mod manifest;
pub mod normalizer;
pub mod registry;

pub use loader::{
    discover, load_checks_from_dir, Candidate, CompositeSource, DirectorySource,
    DiscoverySource, LoadError, StaticSource,
};
pub use manifest::{CheckManifest, DriverSettings, DriverTable};
pub use normalizer::{invoke_safely, Invoker, MALFORMED_RESULT};
pub use registry::{Availability, Catalog, CatalogEntry, EntrySummary};
