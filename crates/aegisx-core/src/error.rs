//! Error types for the Aegis-X policy pipeline.
//!
//! One enum per pipeline stage, mirroring how far upstream a failure can be
//! attributed: a parse failure never carries validation context and vice
//! versa. `ApplyError` is the only kind with sub-variants because the
//! dataplane is the only stage that talks to the outside world.

use thiserror::Error;

/// A document (or one of its fields) could not be decoded into a typed manifest.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{file}: document {index}: {reason}")]
    Malformed {
        file: String,
        index: usize,
        reason: String,
    },

    #[error("{file}: document {index}: unsupported apiVersion {found:?}, expected {expected:?}")]
    UnsupportedApiVersion {
        file: String,
        index: usize,
        found: String,
        expected: &'static str,
    },

    #[error("{file}: document {index}: unknown kind {found:?}")]
    UnknownKind {
        file: String,
        index: usize,
        found: String,
    },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn file(&self) -> &str {
        match self {
            ParseError::Malformed { file, .. } => file,
            ParseError::UnsupportedApiVersion { file, .. } => file,
            ParseError::UnknownKind { file, .. } => file,
            ParseError::Io { path, .. } => path,
        }
    }
}

/// A manifest parsed cleanly but failed semantic checks. Always aggregated:
/// one invocation of the validator surfaces every problem it finds, not
/// just the first.
#[derive(Error, Debug)]
#[error("{} validation error(s):\n{}", .messages.len(), .messages.join("\n"))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Compilation of validated manifests into the intermediate representation
/// failed. Currently this only ever wraps a `ValidationError`, but it is
/// kept distinct from it so call sites can tell which stage produced it.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Failure while translating or applying a ruleset to the live kernel.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("kernel rejected ruleset during {phase}: exit status {exit_code:?}\n{output}")]
    LoaderFailure {
        phase: &'static str,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("could not capture pre-apply snapshot: {0}")]
    SnapshotFailure(String),

    #[error("no rollback snapshot is available")]
    NoSnapshot,

    #[error("could not read live ruleset status: {0}")]
    StatusError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
pub type CompileResult<T> = std::result::Result<T, CompileError>;
pub type ApplyResult<T> = std::result::Result<T, ApplyError>;
