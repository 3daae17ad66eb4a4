//! Built-in reference checks
//!
//! - `tcp-connect`: TCP or TLS reachability of a service
//! - `http-basic`: HTTP Basic authentication (needs the `http` feature)

#[cfg(feature = "http")]
pub mod http_basic;
pub mod tcp;

use crate::loader::StaticSource;
use crate::manifest::DriverTable;

#[cfg(not(feature = "http"))]
use crate::loader::LoadError;

/// Label and origin of the compiled-in checks
pub const BUILTIN: &str = "builtin";

/// The compiled-in checks, as a discovery source
pub fn source() -> StaticSource {
    let source = StaticSource::new(BUILTIN).with_check(tcp::DRIVER, tcp::TcpConnectCheck::default);

    #[cfg(feature = "http")]
    let source = source.with_check(http_basic::DRIVER, http_basic::HttpBasicCheck::default);

    #[cfg(not(feature = "http"))]
    let source = source.with("http-basic", || {
        Err(LoadError::MissingFeature(
            "http-basic requires the 'http' feature".to_string(),
        ))
    });

    source
}

/// Drivers YAML manifests can refer to
pub fn drivers() -> DriverTable {
    let mut drivers = DriverTable::new();
    drivers.register(tcp::DRIVER, tcp::from_settings);

    #[cfg(feature = "http")]
    drivers.register(http_basic::DRIVER, http_basic::from_settings);

    #[cfg(not(feature = "http"))]
    drivers.register_missing("http-basic", "http");

    drivers
}
