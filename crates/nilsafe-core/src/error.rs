//! Error types for nilsafe
//!
//! All fallible operations return `Result<T, Error>`.
//! Errors carry the record, field or graph path needed for diagnosis.

use thiserror::Error;

use crate::normalizer::Step;

/// nilsafe error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No member with this name exists on the record
    #[error("field not found: {record}.{field}")]
    NotFound { record: String, field: String },

    /// Value cannot be assigned or converted to the slot's type
    #[error("type mismatch: expected {expected}, found {found}")]
    IncompatibleType { expected: String, found: String },

    /// Target storage is a transient copy or otherwise not writable in place
    #[error("not addressable: {0}")]
    NotAddressable(String),

    /// Private member whose type does not opt in to external writes
    #[error("field {record}.{field} is private")]
    Inaccessible { record: String, field: String },

    /// Field access on something that is not a record
    #[error("expected a record, found {0}")]
    NotARecord(String),

    /// Dereferenced a null reference
    #[error("null reference to {0}")]
    NullReference(String),

    /// Reference target is already borrowed elsewhere
    #[error("reference to {0} is already borrowed")]
    Borrowed(String),

    #[error("index {index} out of bounds for sequence of length {len}")]
    OutOfBounds { index: usize, len: usize },

    /// Record name not present in the registry
    #[error("unknown record type: {0}")]
    UnknownType(String),

    #[error("duplicate definition: {0}")]
    DuplicateType(String),

    /// Record contains itself by value
    #[error("record type {0} contains itself by value")]
    RecursiveType(String),

    /// Malformed type expression
    #[error("invalid type expression: {0}")]
    TypeSyntax(String),

    #[error("decode error at {path}: {message}")]
    Decode { path: String, message: String },

    #[error("encode error at {path}: {message}")]
    Encode { path: String, message: String },

    /// Absent sequence or mapping reached the wire boundary
    #[error("absent container at {0}")]
    AbsentContainer(String),

    /// Reference cycle reached the wire boundary
    #[error("reference cycle at {0}")]
    Cycle(String),

    #[error("invalid JSON: {0}")]
    Json(String),

    /// A mutation step failed during a fail-fast normalization
    #[error("{step} failed at {path}: {source}")]
    Traversal {
        step: Step,
        path: String,
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Error::IncompatibleType {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

/// Result type alias for nilsafe operations
pub type Result<T> = std::result::Result<T, Error>;
