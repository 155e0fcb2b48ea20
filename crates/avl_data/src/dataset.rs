//! Composable datasets: leaf sources, subsets and concatenations.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::attribute::DataAttribute;
use crate::error::{DataError, Result};
use crate::sample::{Batch, Collate, DefaultCollate, Sample};
use crate::source::SampleSource;
use crate::transform_groups::{
    warn_on_test_group, TransformGroups, TransformPair, EVAL_GROUP, TRAIN_GROUP,
};

/// Positions of a subset in its parent.
#[derive(Debug, Clone)]
pub(crate) enum SubsetIndices {
    /// The first `n` positions, in order.
    Identity(usize),
    Explicit(Arc<[usize]>),
}

impl SubsetIndices {
    pub(crate) fn len(&self) -> usize {
        match self {
            SubsetIndices::Identity(n) => *n,
            SubsetIndices::Explicit(indices) => indices.len(),
        }
    }

    pub(crate) fn get(&self, i: usize) -> usize {
        match self {
            SubsetIndices::Identity(_) => i,
            SubsetIndices::Explicit(indices) => indices[i],
        }
    }

    /// Indices into the parent of `self` for a subset `outer` of `self`.
    fn compose(&self, outer: &SubsetIndices) -> SubsetIndices {
        match (self, outer) {
            (_, SubsetIndices::Identity(n)) if *n == self.len() => self.clone(),
            (SubsetIndices::Identity(_), _) => outer.clone(),
            _ => SubsetIndices::Explicit((0..outer.len()).map(|i| self.get(outer.get(i))).collect()),
        }
    }

    pub(crate) fn apply_to(&self, attribute: &DataAttribute) -> Result<DataAttribute> {
        match self {
            SubsetIndices::Identity(n) if *n == attribute.len() => Ok(attribute.clone()),
            SubsetIndices::Identity(n) => attribute.subset(&(0..*n).collect::<Vec<_>>()),
            SubsetIndices::Explicit(indices) => attribute.subset(indices),
        }
    }
}

/// The structure below a dataset layer.
pub(crate) enum Node<X, Y> {
    Source(Arc<dyn SampleSource<X, Y>>),
    Subset {
        parent: Arc<AvalancheDataset<X, Y>>,
        indices: SubsetIndices,
    },
    Concat {
        parts: Arc<[AvalancheDataset<X, Y>]>,
        /// Cumulative end offset of every part.
        ends: Arc<[usize]>,
    },
}

impl<X, Y> Clone for Node<X, Y> {
    fn clone(&self) -> Self {
        match self {
            Node::Source(source) => Node::Source(Arc::clone(source)),
            Node::Subset { parent, indices } => Node::Subset {
                parent: Arc::clone(parent),
                indices: indices.clone(),
            },
            Node::Concat { parts, ends } => Node::Concat {
                parts: Arc::clone(parts),
                ends: Arc::clone(ends),
            },
        }
    }
}

/// A dataset layer: a leaf source, a subset of another dataset or a
/// concatenation of datasets, plus its own transform groups and attributes.
///
/// Datasets are immutable and cheap to clone. Every operation (subset,
/// concatenation, group switch, transform edit) returns a new dataset that
/// shares the underlying samples.
///
/// An access applies, from the innermost layer outwards, each layer's active
/// group followed by its frozen transforms. The attributes flagged with
/// [`DataAttribute::use_in_getitem`] are appended to the returned sample.
///
/// Wrapping a subset or a concatenation whose own transforms are the identity
/// does not grow the layer chain: subsets of subsets are merged into a single
/// index list and nested concatenations are spliced.
///
/// # Example
///
/// ```rust
/// use avl_data::{AvalancheDataset, VecSource};
///
/// let source = VecSource::new(vec![10, 20, 30], vec![0_i64, 1, 2]).unwrap();
/// let dataset = AvalancheDataset::from_source(source);
/// let subset = dataset.subset(Some(vec![2, 0])).unwrap();
/// assert_eq!(subset.get(0).unwrap().input, 30);
///
/// let both = AvalancheDataset::concat(vec![dataset, subset]).unwrap();
/// assert_eq!(both.len(), 5);
/// ```
pub struct AvalancheDataset<X, Y> {
    node: Node<X, Y>,
    transforms: TransformGroups<X, Y>,
    attributes: Arc<[DataAttribute]>,
    collate: Arc<dyn Collate<X, Y>>,
    len: usize,
}

impl<X: 'static, Y: 'static> AvalancheDataset<X, Y> {
    /// Wrap a sample source.
    pub fn from_source(source: impl SampleSource<X, Y> + 'static) -> Self {
        Self::from_shared_source(Arc::new(source))
    }

    /// Wrap a shared sample source.
    pub fn from_shared_source(source: Arc<dyn SampleSource<X, Y>>) -> Self {
        let len = source.len();
        Self::from_node(Node::Source(source), len, TRAIN_GROUP)
    }

    fn from_node(node: Node<X, Y>, len: usize, group: &str) -> Self {
        Self {
            node,
            transforms: TransformGroups::empty().switched(group),
            attributes: Arc::from(Vec::new()),
            collate: Arc::new(DefaultCollate),
            len,
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The active transform group of this layer.
    #[must_use]
    pub fn current_group(&self) -> &str {
        self.transforms.current_group()
    }

    /// The transform groups of this layer.
    #[must_use]
    pub fn transform_groups(&self) -> &TransformGroups<X, Y> {
        &self.transforms
    }

    /// The attributes of this layer.
    #[must_use]
    pub fn attributes(&self) -> &[DataAttribute] {
        &self.attributes
    }

    /// The attribute named `name`.
    pub fn attribute(&self, name: &str) -> Result<&DataAttribute> {
        self.find_attribute(name)
            .ok_or_else(|| DataError::UnknownAttribute(name.to_string()))
    }

    pub(crate) fn find_attribute(&self, name: &str) -> Option<&DataAttribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Whether the layer has an attribute named `name`.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.find_attribute(name).is_some()
    }

    /// Names of the attributes appended to every accessed sample.
    #[must_use]
    pub fn item_attribute_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.use_in_getitem())
            .map(DataAttribute::name)
            .collect()
    }

    /// Nesting depth of the layer chain. A leaf dataset has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match &self.node {
            Node::Source(_) => 0,
            Node::Subset { parent, .. } => 1 + parent.depth(),
            Node::Concat { parts, .. } => 1 + parts.iter().map(Self::depth).max().unwrap_or(0),
        }
    }

    /// The wrapped dataset, for a subset.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        match &self.node {
            Node::Subset { parent, .. } => Some(parent.as_ref()),
            _ => None,
        }
    }

    /// The direct parts, for a concatenation.
    #[must_use]
    pub fn concat_parts(&self) -> Option<&[Self]> {
        match &self.node {
            Node::Concat { parts, .. } => Some(&**parts),
            _ => None,
        }
    }

    pub(crate) fn node(&self) -> &Node<X, Y> {
        &self.node
    }

    /// The same dataset with `groups` as this layer's transform groups.
    #[must_use]
    pub fn with_transform_groups(&self, groups: TransformGroups<X, Y>) -> Self {
        Self {
            transforms: groups,
            ..self.clone()
        }
    }

    /// The same dataset with `attribute` added, replacing any attribute with
    /// the same name.
    pub fn with_attribute(&self, attribute: DataAttribute) -> Result<Self> {
        if attribute.len() != self.len {
            return Err(DataError::length_mismatch(
                attribute.name(),
                self.len,
                attribute.len(),
            ));
        }
        let mut attributes: Vec<DataAttribute> = self
            .attributes
            .iter()
            .filter(|a| a.name() != attribute.name())
            .cloned()
            .collect();
        attributes.push(attribute);
        Ok(Self {
            attributes: attributes.into(),
            ..self.clone()
        })
    }

    /// The same dataset batched with `collate`.
    #[must_use]
    pub fn with_collate(&self, collate: impl Collate<X, Y> + 'static) -> Self {
        Self {
            collate: Arc::new(collate),
            ..self.clone()
        }
    }

    pub(crate) fn with_shared_collate(&self, collate: Arc<dyn Collate<X, Y>>) -> Self {
        Self {
            collate,
            ..self.clone()
        }
    }

    /// The sample at `index`, with its appended attributes.
    pub fn get(&self, index: usize) -> Result<Sample<X, Y>> {
        let (input, target) = self.get_item(index)?;
        let attributes = self
            .attributes
            .iter()
            .filter(|a| a.use_in_getitem())
            .map(|a| a.value(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sample {
            input,
            target,
            attributes,
        })
    }

    fn get_item(&self, index: usize) -> Result<(X, Y)> {
        if index >= self.len {
            return Err(DataError::IndexOutOfBounds {
                index,
                length: self.len,
            });
        }
        let (input, target) = match &self.node {
            Node::Source(source) => source.get(index)?,
            Node::Subset { parent, indices } => parent.get_item(indices.get(index))?,
            Node::Concat { parts, ends } => {
                let (part, local) = locate(ends, index);
                parts[part].get_item(local)?
            }
        };
        self.transforms.apply(input, target)
    }

    /// Collate the samples at `indices` into a batch.
    pub fn get_batch(&self, indices: &[usize]) -> Result<Batch<X, Y>> {
        let samples = indices
            .iter()
            .map(|&i| self.get(i))
            .collect::<Result<Vec<_>>>()?;
        self.collate.collate(samples)
    }

    /// Collate a contiguous range of samples into a batch.
    pub fn get_range(&self, range: Range<usize>) -> Result<Batch<X, Y>> {
        if range.end > self.len {
            return Err(DataError::IndexOutOfBounds {
                index: range.end.saturating_sub(1),
                length: self.len,
            });
        }
        self.get_batch(&range.collect::<Vec<_>>())
    }

    /// Iterate over all samples in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Sample<X, Y>>> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// A view of the samples at `indices` (all samples, in order, if `None`).
    ///
    /// Attributes are subset along with the samples. The view starts in the
    /// active group of `self` and has no transforms of its own.
    pub fn subset(&self, indices: Option<Vec<usize>>) -> Result<Self> {
        let indices = match indices {
            None => SubsetIndices::Identity(self.len),
            Some(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= self.len) {
                    return Err(DataError::InvalidSubsetIndex {
                        index,
                        length: self.len,
                    });
                }
                SubsetIndices::Explicit(indices.into())
            }
        };

        let attributes = self
            .attributes
            .iter()
            .map(|a| indices.apply_to(a))
            .collect::<Result<Vec<_>>>()?;

        let (parent, indices) = match &self.node {
            Node::Subset {
                parent,
                indices: inner,
            } if self.transforms.is_identity() => {
                tracing::debug!(len = indices.len(), "merging nested subset indices");
                (Arc::clone(parent), inner.compose(&indices))
            }
            _ => (Arc::new(self.clone()), indices),
        };

        let len = indices.len();
        Ok(Self {
            attributes: attributes.into(),
            collate: Arc::clone(&self.collate),
            ..Self::from_node(Node::Subset { parent, indices }, len, self.current_group())
        })
    }

    /// Concatenate datasets end to end.
    ///
    /// If the inputs do not share the same active group, all of them are
    /// switched to `train`. Attributes present in every input are
    /// concatenated; the others are dropped. An empty input list yields an
    /// empty dataset.
    pub fn concat(datasets: impl IntoIterator<Item = Self>) -> Result<Self> {
        let mut datasets: Vec<Self> = datasets.into_iter().collect();

        let uniform = datasets
            .windows(2)
            .all(|pair| pair[0].current_group() == pair[1].current_group());
        let group = if uniform {
            datasets
                .first()
                .map_or(TRAIN_GROUP, |d| d.current_group())
                .to_string()
        } else {
            datasets = datasets.iter().map(|d| d.switched(TRAIN_GROUP)).collect();
            TRAIN_GROUP.to_string()
        };

        let attributes: Vec<DataAttribute> = match datasets.first() {
            Some(first) => first
                .attributes
                .iter()
                .filter_map(|attribute| {
                    let parts = datasets
                        .iter()
                        .map(|d| d.find_attribute(attribute.name()).cloned())
                        .collect::<Option<Vec<_>>>()?;
                    Some(DataAttribute::concat(attribute.name(), &parts))
                })
                .collect(),
            None => Vec::new(),
        };

        let collate = datasets.first().map(|d| Arc::clone(&d.collate));

        let mut parts = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            dataset.flatten_into(&mut parts)?;
        }

        let ends: Arc<[usize]> = parts
            .iter()
            .scan(0, |end, part| {
                *end += part.len();
                Some(*end)
            })
            .collect();
        let len = ends.last().copied().unwrap_or(0);
        tracing::debug!(n_parts = parts.len(), len, "concatenated datasets");

        let mut dataset = Self::from_node(
            Node::Concat {
                parts: parts.into(),
                ends,
            },
            len,
            &group,
        );
        dataset.attributes = attributes.into();
        if let Some(collate) = collate {
            dataset.collate = collate;
        }
        Ok(dataset)
    }

    /// Push the parts `self` contributes to an enclosing concatenation.
    fn flatten_into(self, parts: &mut Vec<Self>) -> Result<()> {
        if !self.transforms.is_identity() {
            parts.push(self);
            return Ok(());
        }
        match &self.node {
            Node::Concat { parts: inner, .. } => {
                parts.extend(inner.iter().cloned());
            }
            Node::Subset { parent, indices } => match &parent.node {
                Node::Concat { parts: inner, ends } if parent.transforms.is_identity() => {
                    split_into_runs(inner, ends, indices, parts)?;
                }
                _ => parts.push(self),
            },
            Node::Source(_) => parts.push(self),
        }
        Ok(())
    }

    /// Switch every layer to `group`.
    ///
    /// `train` and `eval` are always accepted. Any other group must be
    /// defined by at least one layer; layers that do not define it behave as
    /// the identity.
    pub fn with_transforms(&self, group: &str) -> Result<Self> {
        if group != TRAIN_GROUP && group != EVAL_GROUP && !self.defines_group(group) {
            return Err(DataError::UnknownTransformGroup(group.to_string()));
        }
        warn_on_test_group(group);
        Ok(self.switched(group))
    }

    /// Switch every layer to the `train` group.
    #[must_use]
    pub fn train(&self) -> Self {
        self.switched(TRAIN_GROUP)
    }

    /// Switch every layer to the `eval` group.
    #[must_use]
    pub fn eval(&self) -> Self {
        self.switched(EVAL_GROUP)
    }

    fn defines_group(&self, group: &str) -> bool {
        self.transforms.contains(group)
            || match &self.node {
                Node::Source(_) => false,
                Node::Subset { parent, .. } => parent.defines_group(group),
                Node::Concat { parts, .. } => parts.iter().any(|p| p.defines_group(group)),
            }
    }

    pub(crate) fn switched(&self, group: &str) -> Self {
        self.map_layers(&|layer| layer.transforms.switched(group))
    }

    /// Rebuild the layer chain, replacing the transform groups of each layer.
    fn map_layers(&self, f: &dyn Fn(&Self) -> TransformGroups<X, Y>) -> Self {
        let node = match &self.node {
            Node::Source(source) => Node::Source(Arc::clone(source)),
            Node::Subset { parent, indices } => Node::Subset {
                parent: Arc::new(parent.map_layers(f)),
                indices: indices.clone(),
            },
            Node::Concat { parts, ends } => Node::Concat {
                parts: parts.iter().map(|p| p.map_layers(f)).collect(),
                ends: Arc::clone(ends),
            },
        };
        Self {
            node,
            transforms: f(self),
            attributes: Arc::clone(&self.attributes),
            collate: Arc::clone(&self.collate),
            len: self.len,
        }
    }

    /// Bake the active group of every layer into its frozen transforms.
    ///
    /// Frozen transforms are kept when switching groups, so the returned
    /// dataset yields the same samples in every group.
    #[must_use]
    pub fn freeze_transforms(&self) -> Self {
        self.map_layers(&|layer| layer.transforms.freeze())
    }

    /// Replace the transforms of the active group.
    ///
    /// The active group is cleared in every wrapped layer and `pair` becomes
    /// the transforms of this layer. Frozen transforms are kept.
    #[must_use]
    pub fn replace_transforms(&self, pair: TransformPair<X, Y>) -> Self {
        let group = self.current_group().to_string();
        let cleared = self.map_layers(&|layer| {
            if layer.transforms.contains(&group) {
                layer.transforms.with_replaced(&group, TransformPair::identity())
            } else {
                layer.transforms.clone()
            }
        });
        Self {
            transforms: cleared.transforms.with_replaced(&group, pair),
            ..cleared
        }
    }

    /// Append `pair` to the transforms of the active group of this layer.
    #[must_use]
    pub fn add_transforms(&self, pair: TransformPair<X, Y>) -> Self {
        let group = self.current_group().to_string();
        self.add_transforms_to_group(&group, pair)
    }

    /// Append `pair` to the transforms of `group` on this layer.
    #[must_use]
    pub fn add_transforms_to_group(&self, group: &str, pair: TransformPair<X, Y>) -> Self {
        Self {
            transforms: self.transforms.with_appended(group, &pair),
            ..self.clone()
        }
    }

    /// Append `pair` to the frozen transforms of this layer.
    #[must_use]
    pub fn add_frozen_transforms(&self, pair: TransformPair<X, Y>) -> Self {
        Self {
            transforms: self.transforms.with_frozen(&pair),
            ..self.clone()
        }
    }
}

/// Find the part holding `index` and the position inside it.
fn locate(ends: &[usize], index: usize) -> (usize, usize) {
    let part = ends.partition_point(|&end| end <= index);
    let start = if part == 0 { 0 } else { ends[part - 1] };
    (part, index - start)
}

/// Decompose a subset of a concatenation into one subset per contiguous run
/// of indices falling in the same part.
fn split_into_runs<X: 'static, Y: 'static>(
    inner: &[AvalancheDataset<X, Y>],
    ends: &[usize],
    indices: &SubsetIndices,
    parts: &mut Vec<AvalancheDataset<X, Y>>,
) -> Result<()> {
    let mut run: Vec<usize> = Vec::new();
    let mut run_part = None;

    let mut flush = |part: Option<usize>, run: &mut Vec<usize>| -> Result<()> {
        if let Some(part) = part {
            let dataset = &inner[part];
            let whole = run.len() == dataset.len() && run.iter().enumerate().all(|(i, &j)| i == j);
            if whole {
                parts.push(dataset.clone());
            } else {
                parts.push(dataset.subset(Some(std::mem::take(run)))?);
            }
            run.clear();
        }
        Ok(())
    };

    for i in 0..indices.len() {
        let (part, local) = locate(ends, indices.get(i));
        if run_part != Some(part) {
            flush(run_part, &mut run)?;
            run_part = Some(part);
        }
        run.push(local);
    }
    flush(run_part, &mut run)
}

impl<X, Y> Clone for AvalancheDataset<X, Y> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            transforms: self.transforms.clone(),
            attributes: Arc::clone(&self.attributes),
            collate: Arc::clone(&self.collate),
            len: self.len,
        }
    }
}

impl<X, Y> fmt::Debug for AvalancheDataset<X, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.node {
            Node::Source(_) => "source",
            Node::Subset { .. } => "subset",
            Node::Concat { .. } => "concat",
        };
        f.debug_struct("AvalancheDataset")
            .field("kind", &kind)
            .field("len", &self.len)
            .field("current_group", &self.transforms.current_group())
            .field("attributes", &self.attributes)
            .finish()
    }
}
