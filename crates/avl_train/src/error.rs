//! Error types for avl_train.

use avl_core::ErrorKind;
use thiserror::Error;

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that can occur during training and evaluation.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Invalid strategy or plugin configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The learner failed on a batch.
    #[error("Learner error: {0}")]
    LearnerError(String),

    /// A plugin failed.
    #[error("Plugin error: {0}")]
    PluginError(String),

    /// Data error.
    #[error("Data error: {0}")]
    DataError(#[from] avl_data::DataError),

    /// Scenario error.
    #[error("Scenario error: {0}")]
    ScenarioError(#[from] avl_scenarios::ScenarioError),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] avl_core::CoreError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl TrainError {
    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainError::InvalidConfig(_) => ErrorKind::Configuration,
            TrainError::LearnerError(_) | TrainError::PluginError(_) | TrainError::Other(_) => {
                ErrorKind::Other
            }
            TrainError::DataError(e) => e.kind(),
            TrainError::ScenarioError(e) => e.kind(),
            TrainError::CoreError(e) => e.kind(),
        }
    }
}
