//! Experience visibility modes.

use serde::{Deserialize, Serialize};

/// The mode an experience view is in.
///
/// Modes control which experience attributes are readable. For example, task
/// labels may be available during training but not evaluation, while a
/// reference to the whole stream should only ever be read by loggers.
///
/// ```rust
/// use avl_core::ExperienceMode;
///
/// assert!(ExperienceMode::Logging.grants(false, false));
/// assert!(ExperienceMode::Train.grants(true, false));
/// assert!(!ExperienceMode::Eval.grants(true, false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExperienceMode {
    /// Training time (e.g. the train loop of a strategy).
    #[default]
    Train,
    /// Evaluation time (e.g. the eval loop of a strategy).
    Eval,
    /// Maximum visibility, used by loggers and metrics.
    Logging,
}

impl ExperienceMode {
    /// Whether an attribute tagged with the given visibility flags is
    /// readable in this mode.
    #[must_use]
    pub const fn grants(&self, use_in_train: bool, use_in_eval: bool) -> bool {
        match self {
            ExperienceMode::Train => use_in_train,
            ExperienceMode::Eval => use_in_eval,
            ExperienceMode::Logging => true,
        }
    }

    /// Check if this is the training mode.
    #[must_use]
    pub const fn is_train(&self) -> bool {
        matches!(self, ExperienceMode::Train)
    }

    /// Check if this is the evaluation mode.
    #[must_use]
    pub const fn is_eval(&self) -> bool {
        matches!(self, ExperienceMode::Eval)
    }

    /// Check if this is the logging mode.
    #[must_use]
    pub const fn is_logging(&self) -> bool {
        matches!(self, ExperienceMode::Logging)
    }
}

impl std::fmt::Display for ExperienceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperienceMode::Train => write!(f, "train"),
            ExperienceMode::Eval => write!(f, "eval"),
            ExperienceMode::Logging => write!(f, "logging"),
        }
    }
}
