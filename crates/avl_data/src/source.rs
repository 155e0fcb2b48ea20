//! Leaf sample sources wrapped by datasets.

use ndarray::{Array1, Array2, Axis};

use crate::error::{DataError, Result};

/// A random-access collection of raw `(input, target)` samples.
///
/// This is the leaf of every dataset tree. Sources that already know their
/// targets or task labels should return them from [`targets`](Self::targets)
/// and [`task_labels`](Self::task_labels) so that datasets never have to scan
/// the samples.
pub trait SampleSource<X, Y>: Send + Sync {
    /// Number of samples.
    fn len(&self) -> usize;

    /// Whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw sample at `index`.
    fn get(&self, index: usize) -> Result<(X, Y)>;

    /// All targets, if cheaply available.
    fn targets(&self) -> Option<Vec<Y>> {
        None
    }

    /// All task labels, if the source carries them.
    fn task_labels(&self) -> Option<Vec<i64>> {
        None
    }
}

/// An in-memory source backed by vectors.
#[derive(Debug, Clone)]
pub struct VecSource<X, Y> {
    inputs: Vec<X>,
    targets: Vec<Y>,
    task_labels: Option<Vec<i64>>,
}

impl<X, Y> VecSource<X, Y> {
    /// Create a source from aligned inputs and targets.
    pub fn new(inputs: Vec<X>, targets: Vec<Y>) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(DataError::length_mismatch(
                "targets",
                inputs.len(),
                targets.len(),
            ));
        }
        Ok(Self {
            inputs,
            targets,
            task_labels: None,
        })
    }

    /// Attach per-sample task labels.
    pub fn with_task_labels(mut self, task_labels: Vec<i64>) -> Result<Self> {
        if task_labels.len() != self.inputs.len() {
            return Err(DataError::length_mismatch(
                "task labels",
                self.inputs.len(),
                task_labels.len(),
            ));
        }
        self.task_labels = Some(task_labels);
        Ok(self)
    }
}

impl<X, Y> SampleSource<X, Y> for VecSource<X, Y>
where
    X: Clone + Send + Sync,
    Y: Clone + Send + Sync,
{
    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn get(&self, index: usize) -> Result<(X, Y)> {
        match (self.inputs.get(index), self.targets.get(index)) {
            (Some(x), Some(y)) => Ok((x.clone(), y.clone())),
            _ => Err(DataError::IndexOutOfBounds {
                index,
                length: self.inputs.len(),
            }),
        }
    }

    fn targets(&self) -> Option<Vec<Y>> {
        Some(self.targets.clone())
    }

    fn task_labels(&self) -> Option<Vec<i64>> {
        self.task_labels.clone()
    }
}

/// A source of feature rows with integer class labels.
///
/// Row `i` of `x` is the input of sample `i`.
///
/// ```rust
/// use avl_data::{ArraySource, SampleSource};
/// use ndarray::array;
///
/// let source = ArraySource::from_arrays(array![[0.0, 1.0], [2.0, 3.0]], vec![0, 1]).unwrap();
/// let (x, y) = source.get(1).unwrap();
/// assert_eq!(x, array![2.0, 3.0]);
/// assert_eq!(y, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ArraySource {
    x: Array2<f32>,
    y: Vec<i64>,
}

impl ArraySource {
    /// Create a source from a `(samples, features)` array and its labels.
    pub fn from_arrays(x: Array2<f32>, y: Vec<i64>) -> Result<Self> {
        let n_samples = x.len_of(Axis(0));
        if y.len() != n_samples {
            return Err(DataError::length_mismatch("targets", n_samples, y.len()));
        }
        Ok(Self { x, y })
    }

    /// Number of features per sample.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.len_of(Axis(1))
    }

    /// The feature array.
    #[must_use]
    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }
}

impl SampleSource<Array1<f32>, i64> for ArraySource {
    fn len(&self) -> usize {
        self.y.len()
    }

    fn get(&self, index: usize) -> Result<(Array1<f32>, i64)> {
        let target = *self.y.get(index).ok_or(DataError::IndexOutOfBounds {
            index,
            length: self.y.len(),
        })?;
        Ok((self.x.index_axis(Axis(0), index).to_owned(), target))
    }

    fn targets(&self) -> Option<Vec<i64>> {
        Some(self.y.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_vec_source() {
        let source = VecSource::new(vec!["a", "b"], vec![0_i64, 1]).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.get(1).unwrap(), ("b", 1));
        assert!(source.get(2).is_err());
        assert_eq!(source.targets(), Some(vec![0, 1]));
        assert_eq!(source.task_labels(), None);
    }

    #[test]
    fn test_vec_source_length_checks() {
        assert!(VecSource::new(vec![1, 2], vec![0_i64]).is_err());
        let source = VecSource::new(vec![1, 2], vec![0_i64, 0]).unwrap();
        assert!(source.clone().with_task_labels(vec![1]).is_err());
        let labelled = source.with_task_labels(vec![1, 2]).unwrap();
        assert_eq!(labelled.task_labels(), Some(vec![1, 2]));
    }

    #[test]
    fn test_array_source() {
        let x = array![[0.0_f32, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let source = ArraySource::from_arrays(x, vec![2, 1, 0]).unwrap();
        assert_eq!(source.n_features(), 2);
        assert_eq!(source.get(2).unwrap(), (array![4.0, 5.0], 0));
        assert!(source.get(3).is_err());

        assert!(ArraySource::from_arrays(array![[0.0_f32]], vec![0, 1]).is_err());
    }
}
