//! Per-sample auxiliary values attached to datasets.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::error::{DataError, Result};

/// Storage of the attribute values.
///
/// Constant sequences (e.g. default task labels) are kept as a single value so
/// that wrapping a large dataset never allocates a per-sample vector.
#[derive(Clone)]
enum Values<V> {
    Dense(Arc<[V]>),
    Constant { value: V, len: usize },
}

/// A named sequence of per-sample values, e.g. class labels or task labels.
///
/// Attributes are immutable once built: [`subset`](Self::subset),
/// [`concat`](Self::concat) and [`map`](Self::map) produce new attributes.
/// The value → positions index is built lazily on first use and shared by all
/// clones.
///
/// # Example
///
/// ```rust
/// use avl_data::DataAttribute;
///
/// let targets = DataAttribute::new("targets", vec![1_i64, 0, 1, 2]);
/// assert_eq!(targets.indices_of(&1), Some(&[0, 2][..]));
/// assert_eq!(targets.uniques(), vec![1, 0, 2]);
/// ```
#[derive(Clone)]
pub struct DataAttribute<V = i64> {
    name: Arc<str>,
    values: Values<V>,
    use_in_getitem: bool,
    segments: Arc<[usize]>,
    index: Arc<OnceLock<IndexMap<V, Vec<usize>>>>,
}

impl<V> DataAttribute<V>
where
    V: Clone + Eq + Hash,
{
    /// Create an attribute from explicit values.
    pub fn new(name: impl Into<String>, values: Vec<V>) -> Self {
        let len = values.len();
        Self::from_parts(name.into(), Values::Dense(values.into()), Arc::from(vec![len]))
    }

    /// Create an attribute holding the same value for `len` samples.
    pub fn constant(name: impl Into<String>, value: V, len: usize) -> Self {
        Self::from_parts(name.into(), Values::Constant { value, len }, Arc::from(vec![len]))
    }

    fn from_parts(name: String, values: Values<V>, segments: Arc<[usize]>) -> Self {
        Self {
            name: name.into(),
            values,
            use_in_getitem: false,
            segments,
            index: Arc::new(OnceLock::new()),
        }
    }

    /// Mark whether the attribute value is appended to every sample returned
    /// by a dataset access.
    #[must_use]
    pub fn in_getitem(mut self, use_in_getitem: bool) -> Self {
        self.use_in_getitem = use_in_getitem;
        self
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the value is appended to each accessed sample.
    #[must_use]
    pub fn use_in_getitem(&self) -> bool {
        self.use_in_getitem
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.values {
            Values::Dense(values) => values.len(),
            Values::Constant { len, .. } => *len,
        }
    }

    /// Whether the attribute holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether all values are known to be the same constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self.values, Values::Constant { .. })
    }

    /// Lengths of the attributes this one was concatenated from, in order.
    ///
    /// A freshly built attribute has a single segment.
    #[must_use]
    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    /// The value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        match &self.values {
            Values::Dense(values) => values.get(index),
            Values::Constant { value, len } => (index < *len).then_some(value),
        }
    }

    /// The value at `index`, or a bounds error.
    pub fn value(&self, index: usize) -> Result<V> {
        self.get(index).cloned().ok_or(DataError::IndexOutOfBounds {
            index,
            length: self.len(),
        })
    }

    /// Iterate over the values in order.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Copy the values into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<V> {
        self.iter().cloned().collect()
    }

    /// Mapping from each distinct value to the sorted positions holding it.
    ///
    /// Keys are ordered by first occurrence.
    pub fn val_to_idx(&self) -> &IndexMap<V, Vec<usize>> {
        self.index.get_or_init(|| {
            let mut index: IndexMap<V, Vec<usize>> = IndexMap::new();
            match &self.values {
                Values::Constant { value, len } if *len > 0 => {
                    index.insert(value.clone(), (0..*len).collect());
                }
                Values::Constant { .. } => {}
                Values::Dense(values) => {
                    for (position, value) in values.iter().enumerate() {
                        index.entry(value.clone()).or_default().push(position);
                    }
                }
            }
            index
        })
    }

    /// Distinct values in order of first occurrence.
    #[must_use]
    pub fn uniques(&self) -> Vec<V> {
        self.val_to_idx().keys().cloned().collect()
    }

    /// Positions holding `value`, if any.
    #[must_use]
    pub fn indices_of(&self, value: &V) -> Option<&[usize]> {
        self.val_to_idx().get(value).map(Vec::as_slice)
    }

    /// Number of occurrences of every distinct value.
    #[must_use]
    pub fn count(&self) -> IndexMap<V, usize> {
        self.val_to_idx()
            .iter()
            .map(|(value, positions)| (value.clone(), positions.len()))
            .collect()
    }

    /// A new attribute with `values[i]` for every `i` in `indices`.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let length = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= length) {
            return Err(DataError::InvalidSubsetIndex { index, length });
        }
        let values = match &self.values {
            Values::Constant { value, .. } => Values::Constant {
                value: value.clone(),
                len: indices.len(),
            },
            Values::Dense(values) => {
                Values::Dense(indices.iter().map(|&i| values[i].clone()).collect())
            }
        };
        Ok(Self {
            use_in_getitem: self.use_in_getitem,
            ..Self::from_parts(self.name.to_string(), values, Arc::from(vec![indices.len()]))
        })
    }

    /// Concatenate attributes end to end.
    ///
    /// The segment lengths of the inputs are kept so the origin of every
    /// position can be traced back. The result is appended to samples if
    /// every input was.
    pub fn concat(name: impl Into<String>, parts: &[Self]) -> Self {
        let segments: Arc<[usize]> = parts.iter().map(Self::len).collect();
        let use_in_getitem = !parts.is_empty() && parts.iter().all(|p| p.use_in_getitem);

        let constant = parts.first().and_then(|first| match &first.values {
            Values::Constant { value, .. } => parts
                .iter()
                .all(|p| matches!(&p.values, Values::Constant { value: v, .. } if v == value))
                .then(|| value.clone()),
            Values::Dense(_) => None,
        });

        let values = match constant {
            Some(value) => Values::Constant {
                value,
                len: segments.iter().sum(),
            },
            None => Values::Dense(parts.iter().flat_map(Self::iter).cloned().collect()),
        };
        Self {
            use_in_getitem,
            ..Self::from_parts(name.into(), values, segments)
        }
    }

    /// A new attribute with `f` applied to every value.
    #[must_use]
    pub fn map(&self, f: impl Fn(&V) -> V) -> Self {
        let values = match &self.values {
            Values::Constant { value, len } => Values::Constant {
                value: f(value),
                len: *len,
            },
            Values::Dense(values) => Values::Dense(values.iter().map(f).collect()),
        };
        Self {
            use_in_getitem: self.use_in_getitem,
            ..Self::from_parts(self.name.to_string(), values, self.segments.clone())
        }
    }

    /// The same values under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            ..self.clone()
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for DataAttribute<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DataAttribute");
        s.field("name", &self.name);
        match &self.values {
            Values::Dense(values) => s.field("len", &values.len()),
            Values::Constant { value, len } => s.field("constant", value).field("len", len),
        };
        s.field("use_in_getitem", &self.use_in_getitem).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_val_to_idx_is_exact() {
        let attr = DataAttribute::new("targets", vec![3_i64, 1, 3, 2, 1, 3]);
        let index = attr.val_to_idx();
        assert_eq!(index.keys().copied().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(index[&3], vec![0, 2, 5]);
        assert_eq!(index[&1], vec![1, 4]);
        assert_eq!(index[&2], vec![3]);
        assert_eq!(attr.indices_of(&7), None);
    }

    #[test]
    fn test_constant_attribute() {
        let attr = DataAttribute::constant("targets_task_labels", 0_i64, 4);
        assert!(attr.is_constant());
        assert_eq!(attr.len(), 4);
        assert_eq!(attr.get(3), Some(&0));
        assert_eq!(attr.get(4), None);
        assert_eq!(attr.indices_of(&0), Some(&[0, 1, 2, 3][..]));

        let empty = DataAttribute::constant("t", 0_i64, 0);
        assert!(empty.uniques().is_empty());
    }

    #[test]
    fn test_subset() {
        let attr = DataAttribute::new("targets", vec![10_i64, 11, 12, 13]).in_getitem(true);
        let sub = attr.subset(&[3, 0, 3]).unwrap();
        assert_eq!(sub.to_vec(), vec![13, 10, 13]);
        assert!(sub.use_in_getitem());
        assert_eq!(sub.indices_of(&13), Some(&[0, 2][..]));

        let err = attr.subset(&[4]).unwrap_err();
        assert!(matches!(err, DataError::InvalidSubsetIndex { index: 4, length: 4 }));
    }

    #[test]
    fn test_concat_keeps_segments() {
        let a = DataAttribute::new("targets", vec![0_i64, 1]);
        let b = DataAttribute::new("targets", vec![1_i64, 2, 3]);
        let cat = DataAttribute::concat("targets", &[a, b]);
        assert_eq!(cat.to_vec(), vec![0, 1, 1, 2, 3]);
        assert_eq!(cat.segments(), &[2, 3]);
        assert_eq!(cat.indices_of(&1), Some(&[1, 2][..]));
    }

    #[test]
    fn test_concat_of_constants_stays_constant() {
        let a = DataAttribute::constant("t", 0_i64, 2).in_getitem(true);
        let b = DataAttribute::constant("t", 0_i64, 3).in_getitem(true);
        let cat = DataAttribute::concat("t", &[a.clone(), b]);
        assert!(cat.is_constant());
        assert!(cat.use_in_getitem());
        assert_eq!(cat.len(), 5);

        let c = DataAttribute::constant("t", 1_i64, 1);
        let mixed = DataAttribute::concat("t", &[a, c]);
        assert!(!mixed.is_constant());
        assert!(!mixed.use_in_getitem());
        assert_eq!(mixed.to_vec(), vec![0, 0, 1]);
    }

    #[test]
    fn test_map_and_count() {
        let attr = DataAttribute::new("targets", vec![0_i64, 1, 1]);
        let mapped = attr.map(|v| v * 10);
        assert_eq!(mapped.to_vec(), vec![0, 10, 10]);
        assert_eq!(mapped.count()[&10], 2);
        assert_eq!(attr.to_vec(), vec![0, 1, 1]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_val_to_idx_inverts_values(values in prop::collection::vec(0i64..6, 0..50)) {
                let attr = DataAttribute::new("targets", values.clone());
                let mut covered = 0;
                for (value, positions) in attr.val_to_idx() {
                    prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
                    for &i in positions {
                        prop_assert_eq!(values[i], *value);
                    }
                    covered += positions.len();
                }
                prop_assert_eq!(covered, values.len());
            }

            #[test]
            fn prop_subset_of_concat_reads_through(
                a in prop::collection::vec(0i64..4, 0..20),
                b in prop::collection::vec(0i64..4, 0..20),
                picks in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
            ) {
                let parts = [DataAttribute::new("t", a.clone()), DataAttribute::new("t", b.clone())];
                let cat = DataAttribute::concat("t", &parts);
                let all: Vec<i64> = a.iter().chain(&b).copied().collect();
                prop_assert_eq!(cat.to_vec(), all.clone());

                if !all.is_empty() {
                    let indices: Vec<usize> = picks.iter().map(|p| p.index(all.len())).collect();
                    let sub = cat.subset(&indices).unwrap();
                    let expected: Vec<i64> = indices.iter().map(|&i| all[i]).collect();
                    prop_assert_eq!(sub.to_vec(), expected);
                }
            }
        }
    }
}
