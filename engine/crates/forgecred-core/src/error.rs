//! Error types for ForgeCred Engine

use thiserror::Error;

/// Result type alias using ForgeCred Error
pub type Result<T> = std::result::Result<T, Error>;

/// ForgeCred error types
///
/// These cover configuration-level misuse and catalog lookups. Network and
/// authentication failures never show up here; they travel as an `Outcome`.
#[derive(Error, Debug)]
pub enum Error {
    // === Schema / Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    // === Catalog Errors ===
    #[error("Check not found: {check_id}")]
    CheckNotFound { check_id: String },

    #[error("Check unavailable: {check_id} - {reason}")]
    CheckUnavailable { check_id: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

impl Error {
    /// Build a configuration error from anything displayable
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Build a field-level schema error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Lookup failures: the check is absent or cannot be invoked
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::CheckNotFound { .. } | Error::CheckUnavailable { .. }
        )
    }

    /// Configuration problems are a definition bug, not a runtime condition,
    /// and retrying never helps
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::InvalidField { .. })
    }

    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::InvalidField { .. } => "INVALID_FIELD",
            Error::CheckNotFound { .. } => "CHECK_NOT_FOUND",
            Error::CheckUnavailable { .. } => "CHECK_UNAVAILABLE",
            Error::Io(_) => "IO_ERROR",
            Error::FileNotFound { .. } => "FILE_NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let missing = Error::CheckNotFound {
            check_id: "nope".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_fatal());

        let field = Error::field("port", "depends on unknown field 'tls'");
        assert!(field.is_fatal());
        assert_eq!(field.code(), "INVALID_FIELD");
        assert_eq!(
            field.to_string(),
            "Invalid field 'port': depends on unknown field 'tls'"
        );
    }

    #[test]
    fn test_lookup_and_io_errors_are_not_fatal() {
        let unavailable = Error::CheckUnavailable {
            check_id: "ldap".into(),
            reason: "optional library not installed".into(),
        };
        assert!(unavailable.is_not_found());
        assert!(!unavailable.is_fatal());
        assert_eq!(unavailable.code(), "CHECK_UNAVAILABLE");

        let io = Error::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!io.is_fatal());
        assert_eq!(io.code(), "IO_ERROR");

        let file = Error::FileNotFound {
            path: "/srv/checks".into(),
        };
        assert_eq!(file.code(), "FILE_NOT_FOUND");
        assert_eq!(file.to_string(), "File not found: /srv/checks");
    }
}
