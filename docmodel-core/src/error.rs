//! Error types and result types for query construction and execution.
//!
//! Use [`OdmResult<T>`] as the return type for fallible operations. A missing document is
//! never an error: single-result terminals return `Option<T>` instead.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors raised while building, compiling or executing a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdmError {
    /// A builder argument or predicate operand is malformed (for example a negative skip).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A value has a type the operation cannot accept or normalize.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// A raw document could not be decoded into the target type.
    /// `path` is the dotted path of the offending field, empty for the document root.
    #[error("Decode error at `{path}`: {message}")]
    Decode {
        /// Dotted path of the field that failed.
        path: String,
        /// Description of the failure.
        message: String,
    },
    /// Serialization error when converting a value to BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during driver initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error reported by the underlying driver.
    #[error("Driver error: {0}")]
    Driver(String),
}

impl OdmError {
    /// Creates a decode error for the given dotted path.
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        OdmError::Decode { path: path.into(), message: message.into() }
    }

    /// Returns the offending field path for decode errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            OdmError::Decode { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A specialized `Result` type for query operations.
pub type OdmResult<T> = Result<T, OdmError>;

impl From<BsonError> for OdmError {
    fn from(err: BsonError) -> Self {
        OdmError::Serialization(err.to_string())
    }
}
