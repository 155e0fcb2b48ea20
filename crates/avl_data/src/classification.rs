//! Classification datasets: targets, task labels and class remapping.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use avl_core::{CoreError, Transform};

use crate::attribute::DataAttribute;
use crate::dataset::{AvalancheDataset, Node};
use crate::error::{DataError, Result};
use crate::sample::{Batch, Collate, Sample};
use crate::source::SampleSource;
use crate::transform_groups::{TransformGroups, TransformPair};

/// Name of the class label attribute.
pub const TARGETS: &str = "targets";
/// Name of the task label attribute.
pub const TASK_LABELS: &str = "targets_task_labels";

/// Task labels given explicitly to a classification dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLabels {
    /// The same label for every sample.
    Constant(i64),
    /// One label per sample.
    PerSample(Vec<i64>),
}

impl TaskLabels {
    fn into_attribute(self, len: usize) -> Result<DataAttribute> {
        let attribute = match self {
            TaskLabels::Constant(label) => DataAttribute::constant(TASK_LABELS, label, len),
            TaskLabels::PerSample(labels) => {
                if labels.len() != len {
                    return Err(DataError::length_mismatch("task labels", len, labels.len()));
                }
                DataAttribute::new(TASK_LABELS, labels)
            }
        };
        Ok(attribute.in_getitem(true))
    }
}

impl From<i64> for TaskLabels {
    fn from(label: i64) -> Self {
        TaskLabels::Constant(label)
    }
}

impl From<Vec<i64>> for TaskLabels {
    fn from(labels: Vec<i64>) -> Self {
        TaskLabels::PerSample(labels)
    }
}

/// A class remapping: `mapping[original] = new`, or [`ClassMapping::EXCLUDED`].
///
/// Used as a frozen target transform; reading a sample whose class is
/// excluded or outside the mapping is an error.
///
/// ```rust
/// use avl_data::ClassMapping;
///
/// let mapping = ClassMapping::new(vec![2, -1, 0, 1]);
/// assert_eq!(mapping.map(0), Some(2));
/// assert_eq!(mapping.map(1), None);
/// assert_eq!(mapping.map(9), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    mapping: Arc<[i64]>,
}

impl ClassMapping {
    /// Marker for classes excluded by the mapping.
    pub const EXCLUDED: i64 = -1;

    /// Create a mapping indexed by original class id.
    #[must_use]
    pub fn new(mapping: Vec<i64>) -> Self {
        Self {
            mapping: mapping.into(),
        }
    }

    /// The identity mapping over `n_classes` classes.
    #[must_use]
    pub fn identity(n_classes: usize) -> Self {
        Self::new((0..n_classes as i64).collect())
    }

    /// The new id of `class`, unless excluded.
    #[must_use]
    pub fn map(&self, class: i64) -> Option<i64> {
        usize::try_from(class)
            .ok()
            .and_then(|c| self.mapping.get(c).copied())
            .filter(|&new| new != Self::EXCLUDED)
    }

    /// The raw mapping.
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.mapping
    }

    /// Number of original classes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether the mapping covers no class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl Transform<i64> for ClassMapping {
    fn apply(&self, class: i64) -> avl_core::Result<i64> {
        self.map(class).ok_or_else(|| {
            CoreError::InvalidValue(format!("class {class} is excluded by the class mapping"))
        })
    }

    fn name(&self) -> &str {
        "ClassMapping"
    }
}

/// A dataset of samples with integer class targets and task labels.
///
/// Every classification dataset exposes the `targets` attribute and the
/// `targets_task_labels` attribute; the latter is appended to every accessed
/// sample.
pub struct ClassificationDataset<X> {
    data: AvalancheDataset<X, i64>,
    targets: DataAttribute,
    task_labels: DataAttribute,
}

impl<X: 'static> ClassificationDataset<X> {
    /// Start building a classification layer over `base`.
    pub fn builder(base: impl Into<AvalancheDataset<X, i64>>) -> ClassificationDatasetBuilder<X> {
        ClassificationDatasetBuilder::new(base.into())
    }

    /// Wrap a sample source with default settings.
    pub fn from_source(source: impl SampleSource<X, i64> + 'static) -> Result<Self> {
        Self::builder(AvalancheDataset::from_source(source)).build()
    }

    /// Wrap a dataset with default settings.
    pub fn from_dataset(dataset: AvalancheDataset<X, i64>) -> Result<Self> {
        Self::builder(dataset).build()
    }

    fn wrap(data: AvalancheDataset<X, i64>) -> Result<Self> {
        let targets = data.attribute(TARGETS)?.clone();
        let task_labels = data.attribute(TASK_LABELS)?.clone();
        Ok(Self {
            data,
            targets,
            task_labels,
        })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sample at `index`; its only appended attribute is the task label.
    pub fn get(&self, index: usize) -> Result<Sample<X, i64>> {
        self.data.get(index)
    }

    /// Collate the samples at `indices`.
    pub fn get_batch(&self, indices: &[usize]) -> Result<Batch<X, i64>> {
        self.data.get_batch(indices)
    }

    /// Iterate over all samples in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Sample<X, i64>>> + '_ {
        self.data.iter()
    }

    /// The class label of every sample.
    #[must_use]
    pub fn targets(&self) -> &DataAttribute {
        &self.targets
    }

    /// The task label of every sample.
    #[must_use]
    pub fn task_labels(&self) -> &DataAttribute {
        &self.task_labels
    }

    /// Sorted distinct class labels.
    #[must_use]
    pub fn classes(&self) -> Vec<i64> {
        let mut classes = self.targets.uniques();
        classes.sort_unstable();
        classes
    }

    /// Per-task views of the dataset.
    #[must_use]
    pub fn task_set(&self) -> TaskSet<'_, X> {
        TaskSet { dataset: self }
    }

    /// The underlying dataset.
    #[must_use]
    pub fn dataset(&self) -> &AvalancheDataset<X, i64> {
        &self.data
    }

    /// Unwrap into the underlying dataset.
    #[must_use]
    pub fn into_dataset(self) -> AvalancheDataset<X, i64> {
        self.data
    }

    /// The active transform group.
    #[must_use]
    pub fn current_group(&self) -> &str {
        self.data.current_group()
    }

    /// A view over the samples at `indices` (all samples if `None`).
    pub fn subset(&self, indices: Option<Vec<usize>>) -> Result<Self> {
        Self::wrap(self.data.subset(indices)?)
    }

    /// A view over the samples at `indices` with targets remapped.
    ///
    /// The remapping is a frozen target transform, so it survives transform
    /// group switches. Targets of excluded classes read as
    /// [`ClassMapping::EXCLUDED`] in the `targets` attribute.
    pub fn subset_with_mapping(
        &self,
        indices: Option<Vec<usize>>,
        mapping: Option<&ClassMapping>,
    ) -> Result<Self> {
        let subset = self.data.subset(indices)?;
        let Some(mapping) = mapping else {
            return Self::wrap(subset);
        };
        let targets = subset
            .attribute(TARGETS)?
            .map(|&class| mapping.map(class).unwrap_or(ClassMapping::EXCLUDED));
        let subset = subset
            .with_attribute(targets)?
            .add_frozen_transforms(TransformPair::target_only(mapping.clone()));
        Self::wrap(subset)
    }

    /// The same samples with targets remapped.
    pub fn remap_classes(&self, mapping: &ClassMapping) -> Result<Self> {
        self.subset_with_mapping(None, Some(mapping))
    }

    /// The same samples with new task labels.
    pub fn with_task_labels(&self, task_labels: impl Into<TaskLabels>) -> Result<Self> {
        let attribute = task_labels.into().into_attribute(self.len())?;
        Self::wrap(self.data.with_attribute(attribute)?)
    }

    /// Switch every layer to `group`.
    pub fn with_transforms(&self, group: &str) -> Result<Self> {
        Self::wrap(self.data.with_transforms(group)?)
    }

    /// Switch every layer to the `train` group.
    #[must_use]
    pub fn train(&self) -> Self {
        self.rewrapped(self.data.train())
    }

    /// Switch every layer to the `eval` group.
    #[must_use]
    pub fn eval(&self) -> Self {
        self.rewrapped(self.data.eval())
    }

    /// See [`AvalancheDataset::freeze_transforms`].
    #[must_use]
    pub fn freeze_transforms(&self) -> Self {
        self.rewrapped(self.data.freeze_transforms())
    }

    /// See [`AvalancheDataset::replace_transforms`].
    #[must_use]
    pub fn replace_transforms(&self, pair: TransformPair<X, i64>) -> Self {
        self.rewrapped(self.data.replace_transforms(pair))
    }

    /// See [`AvalancheDataset::add_transforms`].
    #[must_use]
    pub fn add_transforms(&self, pair: TransformPair<X, i64>) -> Self {
        self.rewrapped(self.data.add_transforms(pair))
    }

    /// Same attributes, new layer chain.
    fn rewrapped(&self, data: AvalancheDataset<X, i64>) -> Self {
        Self {
            data,
            targets: self.targets.clone(),
            task_labels: self.task_labels.clone(),
        }
    }

    /// Concatenate classification datasets.
    pub fn concat(datasets: impl IntoIterator<Item = Self>) -> Result<Self> {
        let data = AvalancheDataset::concat(datasets.into_iter().map(Self::into_dataset))?;
        if data.is_empty() && !data.has_attribute(TARGETS) {
            return Self::builder(data).targets(Vec::new()).build();
        }
        Self::wrap(data)
    }

    /// Concatenate `self` and `other`.
    pub fn concat_with(&self, other: &Self) -> Result<Self> {
        Self::concat([self.clone(), other.clone()])
    }
}

impl<X> Clone for ClassificationDataset<X> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            targets: self.targets.clone(),
            task_labels: self.task_labels.clone(),
        }
    }
}

impl<X> fmt::Debug for ClassificationDataset<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationDataset")
            .field("data", &self.data)
            .finish()
    }
}

impl<X> From<ClassificationDataset<X>> for AvalancheDataset<X, i64> {
    fn from(dataset: ClassificationDataset<X>) -> Self {
        dataset.data
    }
}

/// Builder for [`ClassificationDataset`].
pub struct ClassificationDatasetBuilder<X> {
    base: AvalancheDataset<X, i64>,
    targets: Option<Vec<i64>>,
    task_labels: Option<TaskLabels>,
    transform_groups: Option<TransformGroups<X, i64>>,
    transform: Option<TransformPair<X, i64>>,
    initial_group: Option<String>,
    collate: Option<Arc<dyn Collate<X, i64>>>,
}

impl<X: 'static> ClassificationDatasetBuilder<X> {
    fn new(base: AvalancheDataset<X, i64>) -> Self {
        Self {
            base,
            targets: None,
            task_labels: None,
            transform_groups: None,
            transform: None,
            initial_group: None,
            collate: None,
        }
    }

    /// Explicit class labels, one per sample.
    #[must_use]
    pub fn targets(mut self, targets: Vec<i64>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Explicit task labels.
    #[must_use]
    pub fn task_labels(mut self, task_labels: impl Into<TaskLabels>) -> Self {
        self.task_labels = Some(task_labels.into());
        self
    }

    /// Named transform groups for the new layer.
    #[must_use]
    pub fn transform_groups(mut self, groups: TransformGroups<X, i64>) -> Self {
        self.transform_groups = Some(groups);
        self
    }

    /// A single pair used for both `train` and `eval`.
    #[must_use]
    pub fn transform(mut self, pair: TransformPair<X, i64>) -> Self {
        self.transform = Some(pair);
        self
    }

    /// The group the dataset starts in.
    #[must_use]
    pub fn initial_group(mut self, group: impl Into<String>) -> Self {
        self.initial_group = Some(group.into());
        self
    }

    /// Collate function used for batches.
    #[must_use]
    pub fn collate(mut self, collate: impl Collate<X, i64> + 'static) -> Self {
        self.collate = Some(Arc::new(collate));
        self
    }

    /// Build the dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if both a transform and transform groups are given,
    /// if explicit labels do not match the dataset length or if the initial
    /// group is not defined.
    pub fn build(self) -> Result<ClassificationDataset<X>> {
        let groups = match (self.transform_groups, self.transform) {
            (Some(_), Some(_)) => {
                return Err(DataError::InvalidConfig(
                    "transform and transform_groups are mutually exclusive".to_string(),
                ))
            }
            (Some(groups), None) => groups,
            (None, Some(pair)) => TransformGroups::uniform(pair),
            (None, None) => TransformGroups::empty(),
        };
        let base = self.base;
        let len = base.len();

        let targets = match self.targets {
            Some(targets) => {
                if targets.len() != len {
                    return Err(DataError::length_mismatch("targets", len, targets.len()));
                }
                DataAttribute::new(TARGETS, targets)
            }
            None => resolve_attribute(&base, TARGETS, &leaf_targets)?,
        };
        let task_labels = match self.task_labels {
            Some(labels) => labels.into_attribute(len)?,
            None => resolve_attribute(&base, TASK_LABELS, &leaf_task_labels)?,
        };

        let group = self
            .initial_group
            .unwrap_or_else(|| base.current_group().to_string());

        let mut layer = base
            .subset(None)?
            .with_transform_groups(groups)
            .with_attribute(targets.renamed(TARGETS).in_getitem(false))?
            .with_attribute(task_labels.renamed(TASK_LABELS).in_getitem(true))?;
        if let Some(collate) = self.collate {
            layer = layer.with_shared_collate(collate);
        }
        ClassificationDataset::wrap(layer.with_transforms(&group)?)
    }
}

/// Locate `name` on the closest layer exposing it, re-indexing through
/// subsets and concatenations, or derive it from the leaf sources.
fn resolve_attribute<X: 'static>(
    dataset: &AvalancheDataset<X, i64>,
    name: &str,
    leaf: &dyn Fn(&dyn SampleSource<X, i64>) -> Result<DataAttribute>,
) -> Result<DataAttribute> {
    if let Some(attribute) = dataset.find_attribute(name) {
        return Ok(attribute.clone());
    }
    match dataset.node() {
        Node::Source(source) => leaf(source.as_ref()),
        Node::Subset { parent, indices } => {
            indices.apply_to(&resolve_attribute(parent, name, leaf)?)
        }
        Node::Concat { parts, .. } => {
            let parts = parts
                .iter()
                .map(|part| resolve_attribute(part, name, leaf))
                .collect::<Result<Vec<_>>>()?;
            Ok(DataAttribute::concat(name, &parts))
        }
    }
}

fn leaf_targets<X>(source: &dyn SampleSource<X, i64>) -> Result<DataAttribute> {
    let targets = match source.targets() {
        Some(targets) => targets,
        None => {
            tracing::debug!(len = source.len(), "scanning samples for targets");
            (0..source.len())
                .map(|i| source.get(i).map(|(_, target)| target))
                .collect::<Result<Vec<_>>>()?
        }
    };
    if targets.len() != source.len() {
        return Err(DataError::length_mismatch("targets", source.len(), targets.len()));
    }
    Ok(DataAttribute::new(TARGETS, targets))
}

fn leaf_task_labels<X>(source: &dyn SampleSource<X, i64>) -> Result<DataAttribute> {
    match source.task_labels() {
        Some(labels) => TaskLabels::PerSample(labels).into_attribute(source.len()),
        None => Ok(DataAttribute::constant(TASK_LABELS, 0, source.len())),
    }
}

/// Lazy mapping from task label to the samples carrying it.
pub struct TaskSet<'a, X> {
    dataset: &'a ClassificationDataset<X>,
}

impl<'a, X: 'static> TaskSet<'a, X> {
    /// Task labels in order of first occurrence.
    #[must_use]
    pub fn keys(&self) -> Vec<i64> {
        self.dataset.task_labels.uniques()
    }

    /// Number of distinct task labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.task_labels.val_to_idx().len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether some sample carries `task_label`.
    #[must_use]
    pub fn contains(&self, task_label: i64) -> bool {
        self.dataset.task_labels.indices_of(&task_label).is_some()
    }

    /// The samples with `task_label`.
    pub fn get(&self, task_label: i64) -> Result<ClassificationDataset<X>> {
        let indices = self
            .dataset
            .task_labels
            .indices_of(&task_label)
            .ok_or(DataError::UnknownTaskLabel(task_label))?;
        self.dataset.subset(Some(indices.to_vec()))
    }

    /// Iterate over `(task_label, dataset)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, ClassificationDataset<X>)>> + 'a {
        let dataset = self.dataset;
        dataset
            .task_labels
            .val_to_idx()
            .iter()
            .map(move |(&label, indices)| {
                dataset
                    .subset(Some(indices.clone()))
                    .map(|subset| (label, subset))
            })
    }
}

/// Concatenate pairs of train/test datasets, giving every pair a disjoint
/// block of class ids.
///
/// The classes of pair `i` (the union of its train and test classes, sorted)
/// are mapped to the next contiguous ids. Returns the concatenated train and
/// test datasets and the new ids of every pair.
pub fn concat_datasets_sequentially<X: 'static>(
    train: &[ClassificationDataset<X>],
    test: &[ClassificationDataset<X>],
) -> Result<(
    ClassificationDataset<X>,
    ClassificationDataset<X>,
    Vec<Vec<i64>>,
)> {
    if train.len() != test.len() {
        return Err(DataError::InvalidConfig(format!(
            "got {} train datasets but {} test datasets",
            train.len(),
            test.len()
        )));
    }

    let mut next_class = 0_i64;
    let mut new_classes = Vec::with_capacity(train.len());
    let mut remapped_train = Vec::with_capacity(train.len());
    let mut remapped_test = Vec::with_capacity(test.len());

    for (train_ds, test_ds) in train.iter().zip(test) {
        let classes: BTreeSet<i64> = train_ds
            .targets()
            .uniques()
            .into_iter()
            .chain(test_ds.targets().uniques())
            .collect();
        if let Some(&negative) = classes.iter().find(|&&c| c < 0) {
            return Err(DataError::InvalidValue(format!(
                "class labels must be non-negative, got {negative}"
            )));
        }

        let size = classes.last().map_or(0, |&max| max as usize + 1);
        let mut mapping = vec![ClassMapping::EXCLUDED; size];
        let mut block = Vec::with_capacity(classes.len());
        for class in classes {
            mapping[class as usize] = next_class;
            block.push(next_class);
            next_class += 1;
        }
        let mapping = ClassMapping::new(mapping);

        remapped_train.push(train_ds.remap_classes(&mapping)?);
        remapped_test.push(test_ds.remap_classes(&mapping)?);
        new_classes.push(block);
    }

    tracing::debug!(
        n_datasets = train.len(),
        n_classes = next_class,
        "concatenated datasets with disjoint class ids"
    );
    Ok((
        ClassificationDataset::concat(remapped_train)?,
        ClassificationDataset::concat(remapped_test)?,
        new_classes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use avl_core::FnTransform;

    fn source(targets: Vec<i64>) -> VecSource<i64, i64> {
        let inputs = (0..targets.len() as i64).collect();
        VecSource::new(inputs, targets).unwrap()
    }

    fn targets_of(ds: &ClassificationDataset<i64>) -> Vec<i64> {
        ds.iter().map(|s| s.unwrap().target).collect()
    }

    fn inputs_of(ds: &ClassificationDataset<i64>) -> Vec<i64> {
        ds.iter().map(|s| s.unwrap().input).collect()
    }

    #[test]
    fn test_default_attributes() {
        let ds = ClassificationDataset::from_source(source(vec![2, 0, 1, 0])).unwrap();
        assert_eq!(ds.targets().to_vec(), vec![2, 0, 1, 0]);
        assert_eq!(ds.task_labels().to_vec(), vec![0; 4]);
        assert_eq!(ds.classes(), vec![0, 1, 2]);

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.target, 2);
        assert_eq!(sample.task_label(), Some(0));
        assert_eq!(ds.dataset().item_attribute_names(), vec![TASK_LABELS]);
    }

    #[test]
    fn test_explicit_labels_take_priority() {
        let ds = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![0, 0])))
            .targets(vec![5, 6])
            .task_labels(vec![1, 2])
            .build()
            .unwrap();
        assert_eq!(ds.targets().to_vec(), vec![5, 6]);
        assert_eq!(ds.get(1).unwrap().attributes, vec![2]);

        let err = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![0, 0])))
            .task_labels(vec![1])
            .build()
            .unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { .. }));
    }

    #[test]
    fn test_transform_and_groups_are_exclusive() {
        let pair = TransformPair::input_only(FnTransform::new("id", |x: i64| Ok(x)));
        let err = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![0])))
            .transform(pair.clone())
            .transform_groups(TransformGroups::uniform(pair))
            .build()
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidConfig(_)));
    }

    #[test]
    fn test_targets_found_through_nested_structure() {
        let a = AvalancheDataset::from_source(source(vec![0, 1, 2]));
        let b = AvalancheDataset::from_source(source(vec![3, 4]));
        let cat = AvalancheDataset::concat(vec![a, b]).unwrap();
        let sub = cat.subset(Some(vec![4, 0, 3])).unwrap();
        let subsub = sub.subset(Some(vec![2, 1])).unwrap();
        let ds = ClassificationDataset::from_dataset(subsub).unwrap();
        assert_eq!(ds.targets().to_vec(), vec![3, 0]);
        assert_eq!(targets_of(&ds), vec![3, 0]);
    }

    #[test]
    fn test_task_set() {
        let ds = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![
            0, 1, 2, 3,
        ])))
        .task_labels(vec![1, 0, 1, 0])
        .build()
        .unwrap();
        let tasks = ds.task_set();
        assert_eq!(tasks.keys(), vec![1, 0]);
        assert_eq!(tasks.len(), 2);

        let task1 = tasks.get(1).unwrap();
        assert_eq!(task1.targets().to_vec(), vec![0, 2]);
        assert_eq!(task1.task_labels().to_vec(), vec![1, 1]);

        let err = tasks.get(7).unwrap_err();
        assert!(matches!(err, DataError::UnknownTaskLabel(7)));
        assert_eq!(err.kind(), avl_core::ErrorKind::Lookup);

        let labels: Vec<i64> = tasks.iter().map(|r| r.unwrap().0).collect();
        assert_eq!(labels, vec![1, 0]);
    }

    #[test]
    fn test_class_mapping_is_frozen() {
        let pair = TransformPair::target_only(FnTransform::new("inc", |y: i64| Ok(y)));
        let ds = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![0, 1, 2])))
            .transform_groups(TransformGroups::train_eval(pair.clone(), pair))
            .build()
            .unwrap();
        let mapping = ClassMapping::new(vec![2, 0, 1]);
        let mapped = ds.remap_classes(&mapping).unwrap();
        assert_eq!(mapped.targets().to_vec(), vec![2, 0, 1]);
        assert_eq!(targets_of(&mapped), vec![2, 0, 1]);
        assert_eq!(targets_of(&mapped.eval()), vec![2, 0, 1]);
        assert_eq!(targets_of(&ds), vec![0, 1, 2]);
    }

    #[test]
    fn test_train_and_eval_views_share_labels() {
        let groups = TransformGroups::train_eval(
            TransformPair::input_only(FnTransform::new("shift", |x: i64| Ok(x + 100))),
            TransformPair::input_only(FnTransform::new("negate", |x: i64| Ok(-x))),
        );
        let ds = ClassificationDataset::builder(AvalancheDataset::from_source(source(vec![
            0, 1, 2, 3, 0,
        ])))
        .transform_groups(groups)
        .task_labels(vec![0, 0, 1, 1, 0])
        .build()
        .unwrap();
        let mapping = ClassMapping::new(vec![3, 2, 1, 0]);
        let sub = ds
            .subset_with_mapping(Some(vec![4, 1, 3]), Some(&mapping))
            .unwrap();

        let train = sub.train();
        let eval = sub.eval();
        assert_eq!(inputs_of(&train), vec![104, 101, 103]);
        assert_eq!(inputs_of(&eval), vec![-4, -1, -3]);

        for view in [&train, &eval] {
            assert_eq!(view.targets().to_vec(), vec![3, 2, 0]);
            assert_eq!(view.task_labels().to_vec(), vec![0, 0, 1]);
            assert_eq!(view.dataset().attribute(TARGETS).unwrap().to_vec(), vec![3, 2, 0]);
            assert_eq!(targets_of(view), vec![3, 2, 0]);
            let labels: Vec<Option<i64>> = view.iter().map(|s| s.unwrap().task_label()).collect();
            assert_eq!(labels, vec![Some(0), Some(0), Some(1)]);
        }

        // building one view does not disturb the other
        assert_eq!(train.current_group(), "train");
        assert_eq!(eval.current_group(), "eval");
        assert_eq!(inputs_of(&train), vec![104, 101, 103]);
        assert_eq!(inputs_of(&sub), vec![104, 101, 103]);
    }

    #[test]
    fn test_excluded_class_reads_fail() {
        let ds = ClassificationDataset::from_source(source(vec![0, 1])).unwrap();
        let mapped = ds.remap_classes(&ClassMapping::new(vec![0, -1])).unwrap();
        assert_eq!(mapped.targets().to_vec(), vec![0, -1]);
        assert!(mapped.get(0).is_ok());
        assert!(mapped.get(1).is_err());
    }

    #[test]
    fn test_concat_keeps_labels() {
        let a = ClassificationDataset::from_source(source(vec![0, 1, 2])).unwrap();
        let b = ClassificationDataset::from_source(source(vec![3, 4, 5, 6, 7]))
            .unwrap()
            .with_task_labels(1)
            .unwrap();
        let cat = a.concat_with(&b).unwrap();
        assert_eq!(cat.len(), 8);
        assert_eq!(cat.targets().to_vec(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(cat.task_set().keys(), vec![0, 1]);
        assert_eq!(cat.get(5).unwrap().task_label(), Some(1));
    }

    #[test]
    fn test_empty_concat() {
        let cat: ClassificationDataset<i64> = ClassificationDataset::concat(Vec::new()).unwrap();
        assert!(cat.is_empty());
        assert!(cat.classes().is_empty());
    }

    #[test]
    fn test_concat_datasets_sequentially() {
        let train = vec![
            ClassificationDataset::from_source(source(vec![0, 1, 1])).unwrap(),
            ClassificationDataset::from_source(source(vec![0, 5])).unwrap(),
        ];
        let test = vec![
            ClassificationDataset::from_source(source(vec![2])).unwrap(),
            ClassificationDataset::from_source(source(vec![5, 0])).unwrap(),
        ];
        let (train_cat, test_cat, blocks) = concat_datasets_sequentially(&train, &test).unwrap();
        assert_eq!(blocks, vec![vec![0, 1, 2], vec![3, 4]]);
        assert_eq!(train_cat.targets().to_vec(), vec![0, 1, 1, 3, 4]);
        assert_eq!(test_cat.targets().to_vec(), vec![2, 4, 3]);
        assert_eq!(targets_of(&train_cat), vec![0, 1, 1, 3, 4]);

        let err = concat_datasets_sequentially(&train, &test[..1]).unwrap_err();
        assert!(matches!(err, DataError::InvalidConfig(_)));
    }
}
