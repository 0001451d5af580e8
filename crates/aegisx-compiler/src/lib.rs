//! Aegis-X Compiler
//!
//! Validates parsed manifests and compiles them into the backend-agnostic
//! intermediate representation the dataplane translator consumes.

pub mod compiler;
pub mod validator;

pub use compiler::compile;
pub use validator::validate_all;
