//! Experiences and their mode-gated attributes.

use std::fmt;
use std::sync::Arc;

use avl_core::ExperienceMode;
use avl_data::ClassificationDataset;

use crate::error::{Result, ScenarioError};
use crate::stream::StreamRef;

/// A value tagged with the modes that may read it.
///
/// [`ExperienceMode::Logging`] always grants access; train and eval access
/// are decided by the two flags.
///
/// ```rust
/// use avl_core::ExperienceMode;
/// use avl_scenarios::ExperienceAttribute;
///
/// let attr = ExperienceAttribute::new(3_usize, false, true);
/// assert!(attr.read("position", ExperienceMode::Train).is_err());
/// assert_eq!(*attr.read("position", ExperienceMode::Eval).unwrap(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceAttribute<T> {
    value: T,
    use_in_train: bool,
    use_in_eval: bool,
}

impl<T> ExperienceAttribute<T> {
    /// Tag `value` with its train and eval visibility.
    pub const fn new(value: T, use_in_train: bool, use_in_eval: bool) -> Self {
        Self {
            value,
            use_in_train,
            use_in_eval,
        }
    }

    /// A value readable only by loggers.
    pub const fn private(value: T) -> Self {
        Self::new(value, false, false)
    }

    /// Whether the value is readable in training mode.
    #[must_use]
    pub fn use_in_train(&self) -> bool {
        self.use_in_train
    }

    /// Whether the value is readable in evaluation mode.
    #[must_use]
    pub fn use_in_eval(&self) -> bool {
        self.use_in_eval
    }

    /// Whether the value is readable in `mode`.
    #[must_use]
    pub fn is_visible(&self, mode: ExperienceMode) -> bool {
        mode.grants(self.use_in_train, self.use_in_eval)
    }

    /// Read the value, failing with a masked-attribute error when `mode`
    /// hides it.
    pub fn read(&self, name: &str, mode: ExperienceMode) -> Result<&T> {
        if self.is_visible(mode) {
            Ok(&self.value)
        } else {
            Err(ScenarioError::masked(name, mode))
        }
    }

    /// The same visibility flags around another value.
    pub(crate) fn with_value<U>(&self, value: U) -> ExperienceAttribute<U> {
        ExperienceAttribute::new(value, self.use_in_train, self.use_in_eval)
    }
}

/// Boundary information of a sub-experience produced by online splitting.
pub(crate) struct OnlineInfo<X> {
    pub(crate) origin_experience: ExperienceAttribute<CLExperience<X>>,
    pub(crate) subexp_size: ExperienceAttribute<usize>,
    pub(crate) is_first_subexp: ExperienceAttribute<bool>,
    pub(crate) is_last_subexp: ExperienceAttribute<bool>,
    pub(crate) sub_stream_length: ExperienceAttribute<usize>,
}

/// One unit of a continual-learning stream.
///
/// An experience bundles a dataset slice with its task labels and classes
/// (always readable) and with gated metadata: its position in the stream
/// (`current_experience`, readable in eval and logging mode) and a reference
/// to the stream itself (`origin_stream`, logging mode only). Online
/// sub-experiences carry further boundary attributes.
///
/// Mode transitions return new views and never modify `self`, so a training
/// loop and a logger can hold differently-gated views of the same experience.
///
/// ```rust
/// use avl_core::ErrorKind;
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{CLExperience, EagerCLStream};
///
/// let data = ClassificationDataset::from_source(
///     VecSource::new(vec![0.0_f32, 1.0], vec![0, 1]).unwrap(),
/// )
/// .unwrap();
/// let stream = EagerCLStream::new("train", vec![CLExperience::new(data, vec![0])]);
///
/// let exp = stream.get(0).unwrap();
/// let err = exp.current_experience().unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::MaskedAttribute);
/// assert_eq!(exp.inference().current_experience().unwrap(), 0);
/// ```
pub struct CLExperience<X> {
    mode: ExperienceMode,
    current_experience: ExperienceAttribute<Option<usize>>,
    origin_stream: ExperienceAttribute<Option<StreamRef<X>>>,
    dataset: ClassificationDataset<X>,
    task_labels: Vec<i64>,
    classes_in_this_experience: Vec<i64>,
    online: Option<Arc<OnlineInfo<X>>>,
}

impl<X: 'static> CLExperience<X> {
    /// Create an experience over `dataset`.
    ///
    /// The classes in the experience are read from the dataset targets.
    #[must_use]
    pub fn new(dataset: ClassificationDataset<X>, task_labels: Vec<i64>) -> Self {
        let classes = dataset.classes();
        Self::with_classes(dataset, task_labels, classes)
    }

    /// Create an experience with an explicit class list.
    #[must_use]
    pub fn with_classes(
        dataset: ClassificationDataset<X>,
        task_labels: Vec<i64>,
        classes_in_this_experience: Vec<i64>,
    ) -> Self {
        Self {
            mode: ExperienceMode::Train,
            current_experience: ExperienceAttribute::new(None, false, true),
            origin_stream: ExperienceAttribute::private(None),
            dataset,
            task_labels,
            classes_in_this_experience,
            online: None,
        }
    }

    pub(crate) fn with_online(mut self, info: OnlineInfo<X>) -> Self {
        self.online = Some(Arc::new(info));
        self
    }

    /// The mode of this view.
    #[must_use]
    pub fn mode(&self) -> ExperienceMode {
        self.mode
    }

    /// A view of this experience in `mode`.
    #[must_use]
    pub fn with_mode(&self, mode: ExperienceMode) -> Self {
        let mut exp = self.clone();
        exp.mode = mode;
        exp
    }

    /// A training view.
    #[must_use]
    pub fn train(&self) -> Self {
        self.with_mode(ExperienceMode::Train)
    }

    /// An evaluation view.
    #[must_use]
    pub fn inference(&self) -> Self {
        self.with_mode(ExperienceMode::Eval)
    }

    /// A logging view, where every attribute is readable.
    #[must_use]
    pub fn logging(&self) -> Self {
        self.with_mode(ExperienceMode::Logging)
    }

    /// The data of this experience.
    #[must_use]
    pub fn dataset(&self) -> &ClassificationDataset<X> {
        &self.dataset
    }

    /// The task labels of this experience.
    #[must_use]
    pub fn task_labels(&self) -> &[i64] {
        &self.task_labels
    }

    /// The task label of a single-task experience.
    pub fn task_label(&self) -> Result<i64> {
        match self.task_labels.as_slice() {
            [label] => Ok(*label),
            labels => Err(ScenarioError::AmbiguousTaskLabel(labels.len())),
        }
    }

    /// The classes in this experience.
    #[must_use]
    pub fn classes_in_this_experience(&self) -> &[i64] {
        &self.classes_in_this_experience
    }

    /// Position of this experience in its origin stream.
    pub fn current_experience(&self) -> Result<usize> {
        self.current_experience
            .read("current_experience", self.mode)?
            .ok_or_else(|| ScenarioError::MissingAttribute("current_experience".to_string()))
    }

    /// The stream this experience was produced by.
    pub fn origin_stream(&self) -> Result<&StreamRef<X>> {
        self.origin_stream
            .read("origin_stream", self.mode)?
            .as_ref()
            .ok_or_else(|| ScenarioError::MissingAttribute("origin_stream".to_string()))
    }

    fn online_info(&self, name: &str) -> Result<&OnlineInfo<X>> {
        self.online
            .as_deref()
            .ok_or_else(|| ScenarioError::MissingAttribute(name.to_string()))
    }

    /// The experience an online sub-experience was split from.
    pub fn origin_experience(&self) -> Result<&CLExperience<X>> {
        const NAME: &str = "origin_experience";
        self.online_info(NAME)?.origin_experience.read(NAME, self.mode)
    }

    /// Nominal size of the sub-experiences of the origin experience.
    pub fn subexp_size(&self) -> Result<usize> {
        const NAME: &str = "subexp_size";
        self.online_info(NAME)?.subexp_size.read(NAME, self.mode).copied()
    }

    /// Whether this is the first sub-experience of its origin experience.
    pub fn is_first_subexp(&self) -> Result<bool> {
        const NAME: &str = "is_first_subexp";
        self.online_info(NAME)?
            .is_first_subexp
            .read(NAME, self.mode)
            .copied()
    }

    /// Whether this is the last, shorter sub-experience of its origin
    /// experience.
    pub fn is_last_subexp(&self) -> Result<bool> {
        const NAME: &str = "is_last_subexp";
        self.online_info(NAME)?
            .is_last_subexp
            .read(NAME, self.mode)
            .copied()
    }

    /// Number of sub-experiences the origin experience was split into.
    pub fn sub_stream_length(&self) -> Result<usize> {
        const NAME: &str = "sub_stream_length";
        self.online_info(NAME)?
            .sub_stream_length
            .read(NAME, self.mode)
            .copied()
    }

    /// Whether this experience was produced by online splitting.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.is_some()
    }

    /// Assign the position and origin stream, keeping visibility flags.
    pub(crate) fn stamped(&self, index: usize, stream: StreamRef<X>) -> Self {
        let mut exp = self.clone();
        exp.current_experience = self.current_experience.with_value(Some(index));
        exp.origin_stream = self.origin_stream.with_value(Some(stream));
        exp
    }
}

impl<X> Clone for CLExperience<X> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            current_experience: self.current_experience.clone(),
            origin_stream: self.origin_stream.clone(),
            dataset: self.dataset.clone(),
            task_labels: self.task_labels.clone(),
            classes_in_this_experience: self.classes_in_this_experience.clone(),
            online: self.online.clone(),
        }
    }
}

impl<X: 'static> fmt::Debug for CLExperience<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CLExperience")
            .field("mode", &self.mode)
            .field("len", &self.dataset.len())
            .field("task_labels", &self.task_labels)
            .field("classes", &self.classes_in_this_experience)
            .field("online", &self.online.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avl_core::ErrorKind;
    use avl_data::VecSource;

    fn experience() -> CLExperience<f32> {
        let source = VecSource::new(vec![0.0, 1.0, 2.0], vec![2, 0, 2]).unwrap();
        CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![1])
    }

    #[test]
    fn test_plain_fields_ignore_mode() {
        let exp = experience();
        for view in [exp.train(), exp.inference(), exp.logging()] {
            assert_eq!(view.classes_in_this_experience(), &[0, 2]);
            assert_eq!(view.task_label().unwrap(), 1);
            assert_eq!(view.dataset().len(), 3);
        }
    }

    #[test]
    fn test_unset_attribute_is_missing_not_masked() {
        let exp = experience().logging();
        let err = exp.current_experience().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(matches!(
            exp.subexp_size(),
            Err(ScenarioError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_masking_checked_before_presence() {
        let exp = experience();
        let err = exp.current_experience().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MaskedAttribute);
        assert!(matches!(
            exp.inference().origin_stream(),
            Err(ScenarioError::MaskedAttribute { .. })
        ));
    }

    #[test]
    fn test_transitions_do_not_mutate() {
        let exp = experience();
        let logging = exp.logging();
        assert_eq!(exp.mode(), ExperienceMode::Train);
        assert_eq!(logging.mode(), ExperienceMode::Logging);
        assert_eq!(logging.train().mode(), ExperienceMode::Train);
    }

    #[test]
    fn test_ambiguous_task_label() {
        let exp = experience();
        let multi = CLExperience::new(exp.dataset().clone(), vec![0, 1]);
        assert!(matches!(
            multi.task_label(),
            Err(ScenarioError::AmbiguousTaskLabel(2))
        ));
        assert_eq!(multi.task_labels(), &[0, 1]);
    }

    #[test]
    fn test_attribute_flags() {
        let attr = ExperienceAttribute::private("x");
        assert!(!attr.is_visible(ExperienceMode::Train));
        assert!(!attr.is_visible(ExperienceMode::Eval));
        assert!(attr.is_visible(ExperienceMode::Logging));
        let moved = attr.with_value(5);
        assert!(!moved.use_in_train());
        assert!(!moved.use_in_eval());
    }
}
