//! Uniform result of a check invocation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The identity-proving call completed and was accepted
    Verified,
    /// The check ran and reported a failure (bad credentials, refused, ...)
    Rejected,
    /// The check returned an error instead of a verdict
    Error,
    /// The invocation exceeded the caller's time budget
    TimedOut,
    /// The schema or inputs could not be resolved
    Configuration,
    /// The check is missing from the catalog or cannot be invoked
    Unavailable,
    /// The check broke its contract (malformed verdict, panic)
    ContractViolation,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Verified => "verified",
            OutcomeKind::Rejected => "rejected",
            OutcomeKind::Error => "error",
            OutcomeKind::TimedOut => "timed_out",
            OutcomeKind::Configuration => "configuration",
            OutcomeKind::Unavailable => "unavailable",
            OutcomeKind::ContractViolation => "contract_violation",
        }
    }
}

/// Result of one invocation: a success flag and a message that is always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    pub kind: OutcomeKind,
}

impl Outcome {
    fn new(success: bool, kind: OutcomeKind, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = kind.as_str().replace('_', " ");
        }
        Self {
            success,
            message,
            kind,
        }
    }

    pub fn verified(message: impl Into<String>) -> Self {
        Self::new(true, OutcomeKind::Verified, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::Rejected, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::Error, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::TimedOut, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::Configuration, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::Unavailable, message)
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::new(false, OutcomeKind::ContractViolation, message)
    }

    /// True when a failure is the check's own report rather than a problem
    /// with the check or its definition
    pub fn is_authentication_result(&self) -> bool {
        matches!(
            self.kind,
            OutcomeKind::Verified | OutcomeKind::Rejected | OutcomeKind::Error | OutcomeKind::TimedOut
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "OK" } else { "FAILED" };
        write!(f, "[{}] {}", status, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_always_present() {
        let outcome = Outcome::timed_out("  ");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "timed out");
    }

    #[test]
    fn test_only_verified_succeeds() {
        assert!(Outcome::verified("Authenticated as admin").success);
        assert!(!Outcome::rejected("Invalid credentials").success);
        assert!(!Outcome::contract_violation("malformed check result").is_authentication_result());
        assert_eq!(
            Outcome::rejected("Invalid credentials").to_string(),
            "[FAILED] Invalid credentials"
        );
    }
}
