//! Error types for avl_data.

use avl_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur in dataset operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Index out of bounds on access.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// A subset was built with an index outside of the wrapped dataset.
    #[error("Subset index {index} is invalid for a dataset of length {length}")]
    InvalidSubsetIndex {
        /// The offending index.
        index: usize,
        /// The length of the wrapped dataset.
        length: usize,
    },

    /// A per-sample sequence has the wrong length.
    #[error("Invalid amount of {what}: expected {expected}, got {got}")]
    LengthMismatch {
        /// What was being checked (e.g. "task labels").
        what: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// A value is outside of its allowed domain.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Invalid combination of arguments.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// No layer of the dataset defines the requested transform group.
    #[error("Unknown transform group '{0}'")]
    UnknownTransformGroup(String),

    /// The dataset contains no sample with the requested task label.
    #[error("Unknown task label {0}")]
    UnknownTaskLabel(i64),

    /// The dataset has no attribute with the requested name.
    #[error("Unknown data attribute '{0}'")]
    UnknownAttribute(String),

    /// Core error (usually raised by a transform).
    #[error("Core error: {0}")]
    CoreError(#[from] CoreError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::IndexOutOfBounds { .. }
            | DataError::InvalidSubsetIndex { .. }
            | DataError::LengthMismatch { .. }
            | DataError::InvalidValue(_) => ErrorKind::Validation,
            DataError::InvalidConfig(_) | DataError::InvalidBatchSize(_) => {
                ErrorKind::Configuration
            }
            DataError::UnknownTransformGroup(_)
            | DataError::UnknownTaskLabel(_)
            | DataError::UnknownAttribute(_) => ErrorKind::Lookup,
            DataError::CoreError(e) => e.kind(),
            DataError::Other(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn length_mismatch(what: &str, expected: usize, got: usize) -> Self {
        DataError::LengthMismatch {
            what: what.to_string(),
            expected,
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = DataError::IndexOutOfBounds {
            index: 3,
            length: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Index 3 out of bounds for length 2");

        assert_eq!(
            DataError::UnknownTaskLabel(4).kind(),
            ErrorKind::Lookup
        );
        assert_eq!(
            DataError::InvalidConfig("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            DataError::from(CoreError::TransformError("x".into())).kind(),
            ErrorKind::Transform
        );
    }
}
