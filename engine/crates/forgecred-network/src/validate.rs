//! Input validation helpers

use forgecred_core::{Error, InputSet, Result};
use std::fmt;
use std::time::Duration;

/// Required fields that were absent or blank, in the order they were asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields(Vec<String>);

impl MissingFields {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn into_names(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{} is required", single),
            names => write!(f, "{} are required", names.join(", ")),
        }
    }
}

impl std::error::Error for MissingFields {}

/// Check that every named input is present.
///
/// A value is missing when it is absent, null, or text that is empty after
/// trimming. Booleans and numbers are never missing. All missing names are
/// reported, not just the first.
pub fn validate_required<S: AsRef<str>>(
    inputs: &InputSet,
    required: &[S],
) -> std::result::Result<(), MissingFields> {
    let missing: Vec<String> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| inputs.get(name).map_or(true, |v| v.is_blank()))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingFields(missing))
    }
}

/// Parse a TCP port from text input
pub fn parse_port(value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::field(
            "port",
            format!("'{}' is not a valid port (1-65535)", value.trim()),
        )),
    }
}

/// Read a timeout in seconds from the named input, falling back when it is
/// absent, unparsable, zero, or too large to represent
pub fn timeout_from(inputs: &InputSet, name: &str, fallback: Duration) -> Duration {
    inputs
        .parse::<f64>(name)
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(fallback)
}
