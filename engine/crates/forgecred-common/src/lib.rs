//! ForgeCred Common - Shared utilities: logging and configuration
//!
//! This crate provides common functionality used by the ForgeCred driver and engine.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigBuilder};
pub use logging::init_logging;
