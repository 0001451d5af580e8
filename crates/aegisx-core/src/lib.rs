//! Aegis-X Core
//!
//! Shared types and errors for the policy pipeline: manifests as authored by
//! operators, the compiled intermediate representation, and the error kinds
//! each pipeline stage can produce.

pub mod error;
pub mod types;
pub mod validation;

pub use error::{ApplyError, ApplyResult, CompileError, CompileResult, ParseError, ParseResult, ValidationError, ValidationResult};
pub use types::*;
