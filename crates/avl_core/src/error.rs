//! Error types for avl_core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse classification of every error raised across the workspace.
///
/// Each crate has its own error enum; all of them report one of these kinds
/// through a `kind()` method so callers can branch without matching on
/// crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid combination of constructor arguments.
    Configuration,
    /// Shape, length or bounds mismatch.
    Validation,
    /// Read of an experience attribute hidden in the current mode.
    MaskedAttribute,
    /// Unknown key: stream name, task label, transform group, attribute.
    Lookup,
    /// A user-provided transform failed.
    Transform,
    /// Serialization or deserialization failure.
    Serialization,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::MaskedAttribute => "masked attribute",
            ErrorKind::Lookup => "lookup",
            ErrorKind::Transform => "transform",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors raised by core types, most notably by transforms.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A transform could not be applied to a value.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// A value was outside of the domain a transform accepts.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TransformError(_) => ErrorKind::Transform,
            CoreError::InvalidValue(_) => ErrorKind::Validation,
            CoreError::SerializationError(_) => ErrorKind::Serialization,
            CoreError::Other(_) => ErrorKind::Other,
        }
    }
}
