//! ForgeCred Network - Connection utilities shared by credential checks
//!
//! This crate provides the operations nearly every check repeats:
//! - TLS context construction (verification toggles, extra CA, client identity)
//! - TCP/TLS reachability probing with classified failure reasons
//! - Required-field validation and typed parsing of text inputs

pub mod probe;
pub mod tls;
pub mod validate;

pub use probe::{probe_tcp, ProbeKind, ProbeReport};
pub use tls::{build_tls_context, TlsContext, TlsOptions};
pub use validate::{parse_port, timeout_from, validate_required, MissingFields};
