//! Replay storage.

use avl_core::Seed;
use avl_data::ClassificationDataset;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::callback::{StrategyContext, StrategyPlugin};
use crate::error::Result;

/// A fixed-size uniform sample of every sample seen so far.
///
/// Each sample gets a random weight when it is first seen and the buffer
/// keeps the `max_size` heaviest. The buffer is a subset view over the
/// concatenation of the datasets it was updated with; no sample is copied.
///
/// ```rust
/// use avl_core::Seed;
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_train::ReservoirSamplingBuffer;
///
/// let data = ClassificationDataset::from_source(
///     VecSource::new((0..100).collect::<Vec<usize>>(), vec![0; 100]).unwrap(),
/// )
/// .unwrap();
///
/// let mut buffer = ReservoirSamplingBuffer::new(10, Seed::new(0));
/// buffer.update(&data).unwrap();
/// assert_eq!(buffer.len(), 10);
/// ```
pub struct ReservoirSamplingBuffer<X> {
    max_size: usize,
    rng: ChaCha8Rng,
    buffer: Option<ClassificationDataset<X>>,
    weights: Vec<f32>,
}

impl<X: 'static> ReservoirSamplingBuffer<X> {
    /// Create an empty buffer holding at most `max_size` samples.
    pub fn new(max_size: usize, seed: Seed) -> Self {
        Self {
            max_size,
            rng: seed.to_rng(),
            buffer: None,
            weights: Vec::new(),
        }
    }

    /// Offer every sample of `data` to the reservoir.
    pub fn update(&mut self, data: &ClassificationDataset<X>) -> Result<()> {
        let mut weights: Vec<f32> = (0..data.len()).map(|_| self.rng.gen()).collect();
        weights.extend_from_slice(&self.weights);

        let combined = match &self.buffer {
            Some(buffer) => data.concat_with(buffer)?,
            None => data.clone(),
        };

        let mut order: Vec<usize> = (0..weights.len()).collect();
        // stable: on equal weights, new samples stay ahead of stored ones
        order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        order.truncate(self.max_size);

        self.weights = order.iter().map(|&i| weights[i]).collect();
        self.buffer = Some(combined.subset(Some(order))?);

        tracing::debug!(
            offered = data.len(),
            stored = self.weights.len(),
            max_size = self.max_size,
            "reservoir updated"
        );
        Ok(())
    }

    /// The stored samples, if the buffer was ever updated.
    pub fn buffer(&self) -> Option<&ClassificationDataset<X>> {
        self.buffer.as_ref()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no sample is stored.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Capacity of the buffer.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Experience replay with a reservoir buffer.
///
/// From the second experience on, the training data is the experience
/// data followed by the buffer. The buffer is updated with the experience
/// data only, after training on it.
pub struct ReplayPlugin<X> {
    storage: ReservoirSamplingBuffer<X>,
}

impl<X: 'static> ReplayPlugin<X> {
    /// Create a replay plugin with a buffer of `mem_size` samples.
    pub fn new(mem_size: usize, seed: Seed) -> Self {
        Self {
            storage: ReservoirSamplingBuffer::new(mem_size, seed),
        }
    }

    /// Get the storage.
    pub fn storage(&self) -> &ReservoirSamplingBuffer<X> {
        &self.storage
    }
}

impl<X: 'static> StrategyPlugin<X> for ReplayPlugin<X> {
    fn adapt_train_dataset(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        if let Some(buffer) = self.storage.buffer().filter(|b| !b.is_empty()) {
            ctx.dataset = ctx.dataset.concat_with(buffer)?;
            tracing::debug!(
                replayed = buffer.len(),
                total = ctx.dataset.len(),
                "added replay samples"
            );
        }
        Ok(())
    }

    fn after_training_exp(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        self.storage.update(&ctx.experience.dataset().train())
    }

    fn name(&self) -> &str {
        "ReplayPlugin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avl_data::VecSource;
    use avl_scenarios::CLExperience;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn data(start: usize, len: usize, class: i64) -> ClassificationDataset<usize> {
        let source = VecSource::new((start..start + len).collect(), vec![class; len]).unwrap();
        ClassificationDataset::from_source(source).unwrap()
    }

    fn inputs(dataset: &ClassificationDataset<usize>) -> Vec<usize> {
        dataset.iter().map(|s| s.unwrap().input).collect()
    }

    #[test]
    fn test_buffer_keeps_small_data_entirely() {
        let mut buffer = ReservoirSamplingBuffer::new(10, Seed::new(0));
        assert!(buffer.is_empty());
        assert!(buffer.buffer().is_none());

        buffer.update(&data(0, 4, 0)).unwrap();
        let mut stored = inputs(buffer.buffer().unwrap());
        stored.sort_unstable();
        assert_eq!(stored, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_buffer_mixes_experiences() {
        let mut buffer = ReservoirSamplingBuffer::new(20, Seed::new(3));
        buffer.update(&data(0, 50, 0)).unwrap();
        buffer.update(&data(100, 50, 1)).unwrap();

        let stored = buffer.buffer().unwrap();
        assert_eq!(stored.len(), 20);
        assert_eq!(buffer.max_size(), 20);
        assert_eq!(stored.classes(), vec![0, 1]);
        let unique: BTreeSet<usize> = inputs(stored).into_iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_buffer_is_seeded() {
        let run = |seed| {
            let mut buffer = ReservoirSamplingBuffer::new(5, Seed::new(seed));
            buffer.update(&data(0, 30, 0)).unwrap();
            inputs(buffer.buffer().unwrap())
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_replay_plugin_extends_training_data() {
        let mut plugin = ReplayPlugin::new(6, Seed::new(1));

        let first = CLExperience::new(data(0, 10, 0), vec![0]);
        let mut ctx = StrategyContext::new(first, true, 1);
        plugin.adapt_train_dataset(&mut ctx).unwrap();
        assert_eq!(ctx.dataset.len(), 10);
        plugin.after_training_exp(&mut ctx).unwrap();
        assert_eq!(plugin.storage().len(), 6);

        let second = CLExperience::new(data(10, 10, 1), vec![0]);
        let mut ctx = StrategyContext::new(second, true, 1);
        plugin.adapt_train_dataset(&mut ctx).unwrap();
        assert_eq!(ctx.dataset.len(), 16);
        assert_eq!(ctx.dataset.classes(), vec![0, 1]);
        plugin.after_training_exp(&mut ctx).unwrap();
        assert_eq!(plugin.storage().len(), 6);
    }

    proptest! {
        #[test]
        fn prop_buffer_never_exceeds_capacity(
            sizes in prop::collection::vec(1usize..40, 1..5),
            max_size in 0usize..30,
            seed in any::<u64>(),
        ) {
            let mut buffer = ReservoirSamplingBuffer::new(max_size, Seed::new(seed));
            let mut offered = 0;
            for (i, size) in sizes.iter().enumerate() {
                buffer.update(&data(offered, *size, i as i64)).unwrap();
                offered += size;
                prop_assert_eq!(buffer.len(), max_size.min(offered));
                prop_assert_eq!(buffer.buffer().unwrap().len(), buffer.len());
            }
        }
    }
}
