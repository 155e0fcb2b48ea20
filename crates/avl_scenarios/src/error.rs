//! Error types for avl_scenarios.

use avl_core::{CoreError, ErrorKind, ExperienceMode};
use avl_data::DataError;
use thiserror::Error;

/// Result type alias using [`ScenarioError`].
pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Errors that can occur while building or reading scenarios.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Invalid combination of constructor arguments.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A gated experience attribute was read in a mode that hides it.
    #[error("Attribute {attribute} is not available for the experience in {mode} mode.")]
    MaskedAttribute {
        /// Name of the attribute.
        attribute: String,
        /// Mode of the experience view.
        mode: ExperienceMode,
    },

    /// The experience does not carry the requested attribute.
    #[error("Experience attribute '{0}' is not set")]
    MissingAttribute(String),

    /// The scenario has no stream with the requested name.
    #[error("Unknown stream '{0}'")]
    UnknownStream(String),

    /// Experience index out of bounds on a stream.
    #[error("Experience {index} out of range for a stream of length {length}")]
    ExperienceOutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the stream.
        length: usize,
    },

    /// Reproducibility data is inconsistent with itself or the dataset.
    #[error("Invalid reproducibility data: {0}")]
    InvalidReproducibilityData(String),

    /// A single task label was requested from a multi-task experience.
    #[error("The experience has {0} task labels, expected exactly one")]
    AmbiguousTaskLabel(usize),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Dataset error.
    #[error("Data error: {0}")]
    DataError(#[from] DataError),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] CoreError),
}

impl ScenarioError {
    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScenarioError::InvalidConfig(_) => ErrorKind::Configuration,
            ScenarioError::MaskedAttribute { .. } => ErrorKind::MaskedAttribute,
            ScenarioError::MissingAttribute(_) | ScenarioError::UnknownStream(_) => {
                ErrorKind::Lookup
            }
            ScenarioError::ExperienceOutOfRange { .. }
            | ScenarioError::InvalidReproducibilityData(_)
            | ScenarioError::AmbiguousTaskLabel(_) => ErrorKind::Validation,
            ScenarioError::Serialization(_) => ErrorKind::Serialization,
            ScenarioError::DataError(e) => e.kind(),
            ScenarioError::CoreError(e) => e.kind(),
        }
    }

    pub(crate) fn masked(attribute: &str, mode: ExperienceMode) -> Self {
        ScenarioError::MaskedAttribute {
            attribute: attribute.to_string(),
            mode,
        }
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(e: serde_json::Error) -> Self {
        ScenarioError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_message() {
        let err = ScenarioError::masked("current_experience", ExperienceMode::Train);
        assert_eq!(
            err.to_string(),
            "Attribute current_experience is not available for the experience in train mode."
        );
        assert_eq!(err.kind(), ErrorKind::MaskedAttribute);
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(
            ScenarioError::UnknownStream("valid".into()).kind(),
            ErrorKind::Lookup
        );
        assert_eq!(
            ScenarioError::InvalidConfig("x".into()).kind(),
            ErrorKind::Configuration
        );
        let data: ScenarioError = DataError::UnknownTaskLabel(3).into();
        assert_eq!(data.kind(), ErrorKind::Lookup);
    }
}
