//! Samples, batches and collate functions.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{DataError, Result};

/// One sample returned by a dataset access.
///
/// `attributes` holds the values of the attributes that are appended on
/// access (e.g. the task label), in the order reported by
/// [`AvalancheDataset::item_attribute_names`](crate::AvalancheDataset::item_attribute_names).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<X, Y> {
    /// The (transformed) input.
    pub input: X,
    /// The (transformed) target.
    pub target: Y,
    /// Appended attribute values.
    pub attributes: Vec<i64>,
}

impl<X, Y> Sample<X, Y> {
    /// The first appended attribute value, which is the task label for
    /// classification datasets.
    #[must_use]
    pub fn task_label(&self) -> Option<i64> {
        self.attributes.first().copied()
    }
}

/// A batch of samples, stored column-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<X, Y> {
    /// Inputs in sample order.
    pub inputs: Vec<X>,
    /// Targets in sample order.
    pub targets: Vec<Y>,
    /// One column per appended attribute.
    pub attributes: Vec<Vec<i64>>,
}

impl<X, Y> Batch<X, Y> {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The task label column, if the samples carried one.
    #[must_use]
    pub fn task_labels(&self) -> Option<&[i64]> {
        self.attributes.first().map(Vec::as_slice)
    }
}

impl<Y> Batch<Array1<f32>, Y> {
    /// Stack the inputs into a `(batch, features)` array.
    pub fn stack_inputs(&self) -> Result<Array2<f32>> {
        let views: Vec<ArrayView1<'_, f32>> = self.inputs.iter().map(Array1::view).collect();
        ndarray::stack(Axis(0), &views)
            .map_err(|e| DataError::InvalidValue(format!("cannot stack inputs: {e}")))
    }
}

/// Turns a list of samples into a batch.
pub trait Collate<X, Y>: Send + Sync {
    /// Collate the samples.
    fn collate(&self, samples: Vec<Sample<X, Y>>) -> Result<Batch<X, Y>>;
}

/// Column-wise collate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollate;

impl<X, Y> Collate<X, Y> for DefaultCollate {
    fn collate(&self, samples: Vec<Sample<X, Y>>) -> Result<Batch<X, Y>> {
        let n_attributes = samples.first().map_or(0, |s| s.attributes.len());
        let mut inputs = Vec::with_capacity(samples.len());
        let mut targets = Vec::with_capacity(samples.len());
        let mut attributes = vec![Vec::with_capacity(samples.len()); n_attributes];

        for sample in samples {
            if sample.attributes.len() != n_attributes {
                return Err(DataError::length_mismatch(
                    "sample attributes",
                    n_attributes,
                    sample.attributes.len(),
                ));
            }
            inputs.push(sample.input);
            targets.push(sample.target);
            for (column, value) in attributes.iter_mut().zip(sample.attributes) {
                column.push(value);
            }
        }

        Ok(Batch {
            inputs,
            targets,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample(x: f32, y: i64, t: i64) -> Sample<Array1<f32>, i64> {
        Sample {
            input: array![x, x + 1.0],
            target: y,
            attributes: vec![t],
        }
    }

    #[test]
    fn test_default_collate() {
        let batch = DefaultCollate
            .collate(vec![sample(0.0, 1, 0), sample(2.0, 3, 1)])
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.targets, vec![1, 3]);
        assert_eq!(batch.task_labels(), Some(&[0, 1][..]));

        let x = batch.stack_inputs().unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[1, 1]], 3.0);
    }

    #[test]
    fn test_collate_rejects_ragged_attributes() {
        let mut ragged = sample(0.0, 0, 0);
        ragged.attributes.clear();
        let err = DefaultCollate
            .collate(vec![sample(0.0, 0, 0), ragged])
            .unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let batch: Batch<Array1<f32>, i64> = DefaultCollate.collate(Vec::new()).unwrap();
        assert!(batch.is_empty());
        assert!(batch.task_labels().is_none());
    }
}
