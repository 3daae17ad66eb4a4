//! ForgeCred Core - Foundation types, traits, and error handling
//!
//! This crate provides the core abstractions every credential check plugs into:
//! - `FieldSpec`: Declarative description of one input a check needs
//! - `resolve`: Turns a field list plus raw user input into a complete `InputSet`
//! - `CredentialCheck`: The trait that all credential checks implement
//! - `Outcome`: The uniform two-valued result of an invocation

pub mod check;
pub mod error;
pub mod field;
pub mod inputs;
pub mod outcome;
pub mod resolve;
pub mod value;

// Re-export commonly used types at crate root
pub use check::{AuthResult, CheckDescriptor, CheckSchema, CredentialCheck, Verdict};
pub use error::{Error, Result};
pub use field::{validate_schema, Dependency, FieldKind, FieldSpec};
pub use inputs::{InputSet, RawInputs};
pub use outcome::{Outcome, OutcomeKind};
pub use resolve::resolve;
pub use value::Value;
