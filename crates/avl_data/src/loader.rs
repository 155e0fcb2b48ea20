//! Dataloader for batched iteration.

use avl_core::Seed;

use crate::dataset::AvalancheDataset;
use crate::error::{DataError, Result};
use crate::sample::Batch;

/// A dataloader that produces batches from a dataset.
///
/// Batches are built with the dataset's collate function. Shuffling is
/// deterministic when a seed is set; every epoch draws a different order
/// derived from that seed.
///
/// # Example
///
/// ```rust
/// use avl_core::Seed;
/// use avl_data::{AvalancheDataset, DataLoader, VecSource};
///
/// let source = VecSource::new((0..10).collect::<Vec<i32>>(), vec![0_i64; 10]).unwrap();
/// let loader = DataLoader::builder(AvalancheDataset::from_source(source))
///     .batch_size(4)
///     .shuffle(true)
///     .seed(Seed::new(42))
///     .build()
///     .unwrap();
///
/// assert_eq!(loader.n_batches(), 3);
/// for batch in loader.iter() {
///     assert!(batch.unwrap().len() <= 4);
/// }
/// ```
pub struct DataLoader<X, Y> {
    dataset: AvalancheDataset<X, Y>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl<X: 'static, Y: 'static> DataLoader<X, Y> {
    /// Create a new dataloader builder.
    #[must_use]
    pub fn builder(dataset: impl Into<AvalancheDataset<X, Y>>) -> DataLoaderBuilder<X, Y> {
        DataLoaderBuilder::new(dataset.into())
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &AvalancheDataset<X, Y> {
        &self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get the number of batches.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            (n + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get the total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Check if the loader is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Iterate over the batches of the first epoch.
    #[must_use]
    pub fn iter(&self) -> DataLoaderIter<'_, X, Y> {
        self.iter_epoch(0)
    }

    /// Iterate over the batches of `epoch`.
    #[must_use]
    pub fn iter_epoch(&self, epoch: usize) -> DataLoaderIter<'_, X, Y> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            self.seed
                .derive(&format!("epoch-{epoch}"))
                .shuffle(&mut indices);
        }
        DataLoaderIter {
            loader: self,
            indices,
            current_batch: 0,
            n_batches: self.n_batches(),
        }
    }
}

/// Builder for [`DataLoader`].
pub struct DataLoaderBuilder<X, Y> {
    dataset: AvalancheDataset<X, Y>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<Seed>,
}

impl<X: 'static, Y: 'static> DataLoaderBuilder<X, Y> {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: AvalancheDataset<X, Y>) -> Self {
        Self {
            dataset,
            batch_size: 32,
            shuffle: false,
            drop_last: false,
            seed: None,
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the dataloader.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is zero.
    pub fn build(self) -> Result<DataLoader<X, Y>> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        Ok(DataLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
            seed: self.seed.unwrap_or_else(Seed::from_entropy),
        })
    }
}

/// Iterator over batches from a [`DataLoader`].
pub struct DataLoaderIter<'a, X, Y> {
    loader: &'a DataLoader<X, Y>,
    indices: Vec<usize>,
    current_batch: usize,
    n_batches: usize,
}

impl<X: 'static, Y: 'static> Iterator for DataLoaderIter<'_, X, Y> {
    type Item = Result<Batch<X, Y>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }

        let start = self.current_batch * self.loader.batch_size;
        let end = std::cmp::min(start + self.loader.batch_size, self.indices.len());
        self.current_batch += 1;

        Some(self.loader.dataset.get_batch(&self.indices[start..end]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<X: 'static, Y: 'static> ExactSizeIterator for DataLoaderIter<'_, X, Y> {}
