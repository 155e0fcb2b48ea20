//! The experience loop.

use std::time::Instant;

use avl_core::Seed;
use avl_data::{Batch, DataLoader};
use avl_scenarios::{CLExperience, EagerCLStream};
use serde::{Deserialize, Serialize};

use crate::callback::{PluginList, StrategyContext, StrategyPlugin};
use crate::error::{Result, TrainError};

/// Outcome of evaluating one mini-batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOutcome {
    /// Mean loss over the batch.
    pub loss: f32,
    /// Number of correctly classified samples, when the learner reports it.
    pub n_correct: Option<usize>,
}

/// The model side of a strategy.
///
/// Implementors own whatever state the update needs; the loop only hands
/// them mini-batches of the current experience.
pub trait Learner<X> {
    /// Update on one training mini-batch and return its mean loss.
    fn train_batch(&mut self, batch: &Batch<X, i64>) -> Result<f32>;

    /// Score one evaluation mini-batch without updating.
    fn eval_batch(&mut self, batch: &Batch<X, i64>) -> Result<BatchOutcome>;
}

/// Configuration for [`Strategy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Training mini-batch size.
    pub train_mb_size: usize,
    /// Epochs per training experience.
    pub train_epochs: usize,
    /// Evaluation mini-batch size.
    pub eval_mb_size: usize,
    /// Whether to shuffle the training data every epoch.
    pub shuffle: bool,
    /// Whether to drop the last incomplete training batch.
    pub drop_last: bool,
    /// Seed for shuffling. `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            train_mb_size: 32,
            train_epochs: 1,
            eval_mb_size: 32,
            shuffle: true,
            drop_last: false,
            seed: None,
        }
    }
}

impl StrategyConfig {
    /// Set the training mini-batch size.
    #[must_use]
    pub fn with_train_mb_size(mut self, size: usize) -> Self {
        self.train_mb_size = size;
        self
    }

    /// Set the number of epochs per experience.
    #[must_use]
    pub fn with_train_epochs(mut self, epochs: usize) -> Self {
        self.train_epochs = epochs;
        self
    }

    /// Set the evaluation mini-batch size.
    #[must_use]
    pub fn with_eval_mb_size(mut self, size: usize) -> Self {
        self.eval_mb_size = size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.train_mb_size == 0 || self.eval_mb_size == 0 {
            return Err(TrainError::InvalidConfig(
                "mini-batch sizes must be positive".to_string(),
            ));
        }
        if self.train_epochs == 0 {
            return Err(TrainError::InvalidConfig(
                "train_epochs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of training on one experience.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    /// Samples in the (possibly adapted) training dataset.
    pub n_samples: usize,
    /// Mean loss of every epoch that ran.
    pub epoch_losses: Vec<f32>,
    /// Whether a plugin stopped training early.
    pub stopped_early: bool,
    /// Wall-clock time in seconds.
    pub elapsed_secs: f64,
}

/// Result of evaluating one experience.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// Position of the experience in its stream.
    pub experience: usize,
    /// Task labels of the experience.
    pub task_labels: Vec<i64>,
    /// Number of evaluated samples.
    pub n_samples: usize,
    /// Sample-weighted mean loss.
    pub mean_loss: f32,
    /// Accuracy, when the learner reported correct counts for every batch.
    pub accuracy: Option<f32>,
}

/// Drives a [`Learner`] over the experiences of a scenario.
///
/// Training sees experiences in train mode and the `"train"` transform
/// group; evaluation sees them in eval mode with the `"eval"` group.
pub struct Strategy<X, L> {
    learner: L,
    config: StrategyConfig,
    plugins: PluginList<X>,
    seed: Seed,
    n_trained: usize,
}

impl<X: 'static, L: Learner<X>> Strategy<X, L> {
    /// Create a strategy.
    pub fn new(learner: L, config: StrategyConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.map(Seed::new).unwrap_or_else(Seed::from_entropy);
        Ok(Self {
            learner,
            config,
            plugins: PluginList::new(),
            seed,
            n_trained: 0,
        })
    }

    /// Add a plugin.
    #[must_use]
    pub fn with_plugin<P: StrategyPlugin<X> + 'static>(mut self, plugin: P) -> Self {
        self.plugins.add(plugin);
        self
    }

    /// Add a plugin in place.
    pub fn add_plugin<P: StrategyPlugin<X> + 'static>(&mut self, plugin: P) {
        self.plugins.add(plugin);
    }

    /// Get the learner.
    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Get the learner mutably.
    pub fn learner_mut(&mut self) -> &mut L {
        &mut self.learner
    }

    /// Consume the strategy and return the learner.
    pub fn into_learner(self) -> L {
        self.learner
    }

    /// Get the configuration.
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Get the plugins.
    pub fn plugins(&self) -> &PluginList<X> {
        &self.plugins
    }

    /// Number of experiences trained so far.
    pub fn n_trained(&self) -> usize {
        self.n_trained
    }

    /// Train on one experience.
    pub fn train(&mut self, experience: &CLExperience<X>) -> Result<TrainResult> {
        let start = Instant::now();
        let mut ctx = StrategyContext::new(experience.train(), true, self.config.train_epochs);

        self.plugins.before_training_exp(&mut ctx)?;
        self.plugins.adapt_train_dataset(&mut ctx)?;

        let loader = DataLoader::builder(ctx.dataset.clone())
            .batch_size(self.config.train_mb_size)
            .shuffle(self.config.shuffle)
            .drop_last(self.config.drop_last)
            .seed(self.seed.derive(&format!("experience-{}", self.n_trained)))
            .build()?;
        ctx.n_batches = loader.n_batches();

        let mut epoch_losses = Vec::with_capacity(self.config.train_epochs);
        for epoch in 0..self.config.train_epochs {
            ctx.epoch = epoch;
            ctx.iteration = 0;
            ctx.epoch_loss = None;
            self.plugins.before_training_epoch(&mut ctx)?;

            let mut total = 0.0;
            let mut seen = 0;
            for (iteration, batch) in loader.iter_epoch(epoch).enumerate() {
                let batch = batch?;
                ctx.iteration = iteration;
                self.plugins.before_training_iteration(&mut ctx)?;

                let loss = self.learner.train_batch(&batch)?;
                ctx.loss = Some(loss);
                total += loss * batch.len() as f32;
                seen += batch.len();

                self.plugins.after_training_iteration(&mut ctx)?;
                if ctx.stop_training {
                    break;
                }
            }

            if seen > 0 {
                let mean = total / seen as f32;
                ctx.epoch_loss = Some(mean);
                epoch_losses.push(mean);
            }
            self.plugins.after_training_epoch(&mut ctx)?;
            if ctx.stop_training {
                tracing::debug!(epoch, "training stopped by a plugin");
                break;
            }
        }

        self.plugins.after_training_exp(&mut ctx)?;
        self.n_trained += 1;

        Ok(TrainResult {
            n_samples: ctx.dataset.len(),
            epoch_losses,
            stopped_early: ctx.stop_training,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Train on every experience of a stream, in order.
    pub fn train_stream<'a, I>(&mut self, experiences: I) -> Result<Vec<TrainResult>>
    where
        I: IntoIterator<Item = &'a CLExperience<X>>,
    {
        experiences
            .into_iter()
            .map(|experience| self.train(experience))
            .collect()
    }

    /// Evaluate every experience of a stream.
    pub fn eval(&mut self, stream: &EagerCLStream<X>) -> Result<Vec<EvalResult>> {
        let mut results = Vec::with_capacity(stream.len());
        for (position, experience) in stream.iter().enumerate() {
            results.push(self.eval_experience(experience, position)?);
        }
        Ok(results)
    }

    fn eval_experience(
        &mut self,
        experience: &CLExperience<X>,
        position: usize,
    ) -> Result<EvalResult> {
        let mut ctx = StrategyContext::new(experience.inference(), false, 1);
        self.plugins.before_eval_exp(&mut ctx)?;

        let loader = DataLoader::builder(ctx.dataset.clone())
            .batch_size(self.config.eval_mb_size)
            .build()?;
        ctx.n_batches = loader.n_batches();

        let mut total = 0.0;
        let mut seen = 0;
        let mut correct = Some(0);
        for (iteration, batch) in loader.iter().enumerate() {
            let batch = batch?;
            ctx.iteration = iteration;
            let outcome = self.learner.eval_batch(&batch)?;
            ctx.loss = Some(outcome.loss);
            total += outcome.loss * batch.len() as f32;
            seen += batch.len();
            correct = correct.zip(outcome.n_correct).map(|(a, b)| a + b);
            self.plugins.after_eval_iteration(&mut ctx)?;
        }

        let mean_loss = if seen > 0 { total / seen as f32 } else { 0.0 };
        ctx.epoch_loss = Some(mean_loss);
        self.plugins.after_eval_exp(&mut ctx)?;

        Ok(EvalResult {
            experience: ctx.experience.current_experience().unwrap_or(position),
            task_labels: ctx.experience.task_labels().to_vec(),
            n_samples: seen,
            mean_loss,
            accuracy: correct
                .filter(|_| seen > 0)
                .map(|c| c as f32 / seen as f32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avl_data::{ClassificationDataset, VecSource};
    use avl_scenarios::{NCScenario, NCScenarioConfig};
    use std::collections::BTreeSet;

    /// Predicts the majority class seen so far; loss is the error rate.
    #[derive(Default)]
    struct MajorityLearner {
        counts: std::collections::BTreeMap<i64, usize>,
        seen_inputs: Vec<usize>,
    }

    impl MajorityLearner {
        fn prediction(&self) -> Option<i64> {
            self.counts
                .iter()
                .max_by_key(|(class, count)| (**count, std::cmp::Reverse(**class)))
                .map(|(class, _)| *class)
        }
    }

    impl Learner<usize> for MajorityLearner {
        fn train_batch(&mut self, batch: &Batch<usize, i64>) -> Result<f32> {
            for (input, target) in batch.inputs.iter().zip(&batch.targets) {
                *self.counts.entry(*target).or_default() += 1;
                self.seen_inputs.push(*input);
            }
            Ok(1.0 / self.seen_inputs.len() as f32)
        }

        fn eval_batch(&mut self, batch: &Batch<usize, i64>) -> Result<BatchOutcome> {
            let prediction = self.prediction();
            let n_correct = batch
                .targets
                .iter()
                .filter(|t| Some(**t) == prediction)
                .count();
            Ok(BatchOutcome {
                loss: 1.0 - n_correct as f32 / batch.len() as f32,
                n_correct: Some(n_correct),
            })
        }
    }

    fn scenario() -> NCScenario<usize> {
        let targets: Vec<i64> = (0..40).map(|i| (i % 4) as i64).collect();
        let data = |n: usize| {
            let source = VecSource::new((0..n).collect(), targets[..n].to_vec()).unwrap();
            ClassificationDataset::from_source(source).unwrap()
        };
        let config = NCScenarioConfig::new(2).with_shuffle(false);
        NCScenario::new(data(40), data(20), &config).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(StrategyConfig::default().validate().is_ok());
        assert!(StrategyConfig::default()
            .with_train_mb_size(0)
            .validate()
            .is_err());
        assert!(StrategyConfig::default()
            .with_train_epochs(0)
            .validate()
            .is_err());
        assert!(Strategy::<usize, _>::new(
            MajorityLearner::default(),
            StrategyConfig::default().with_eval_mb_size(0)
        )
        .is_err());
    }

    #[test]
    fn test_train_visits_every_sample_each_epoch() {
        let scenario = scenario();
        let config = StrategyConfig::default()
            .with_train_mb_size(3)
            .with_train_epochs(2)
            .with_seed(0);
        let mut strategy = Strategy::new(MajorityLearner::default(), config).unwrap();

        let stream = scenario.train_stream();
        let first = stream.get(0).unwrap();
        let result = strategy.train(first).unwrap();

        assert_eq!(result.n_samples, 20);
        assert_eq!(result.epoch_losses.len(), 2);
        assert!(!result.stopped_early);
        assert_eq!(strategy.n_trained(), 1);

        let seen = &strategy.learner().seen_inputs;
        assert_eq!(seen.len(), 40);
        let unique: BTreeSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_eval_reports_accuracy_per_experience() {
        let scenario = scenario();
        let config = StrategyConfig::default().with_seed(1);
        let mut strategy = Strategy::new(MajorityLearner::default(), config).unwrap();

        let train = scenario.train_stream();
        strategy.train_stream(train.iter()).unwrap();

        let results = strategy.eval(scenario.test_stream()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].experience, 0);
        assert_eq!(results[1].experience, 1);
        assert_eq!(results[0].n_samples + results[1].n_samples, 20);
        assert!(results.iter().all(|r| r.task_labels == vec![0]));
        let total: f32 = results
            .iter()
            .map(|r| r.accuracy.unwrap() * r.n_samples as f32)
            .sum();
        assert!(total > 0.0);
    }

    struct StopAfterFirstBatch;

    impl StrategyPlugin<usize> for StopAfterFirstBatch {
        fn after_training_iteration(&mut self, ctx: &mut StrategyContext<usize>) -> Result<()> {
            ctx.stop_training = true;
            Ok(())
        }
    }

    #[test]
    fn test_plugin_can_stop_training() {
        let scenario = scenario();
        let config = StrategyConfig::default()
            .with_train_mb_size(4)
            .with_train_epochs(5);
        let mut strategy = Strategy::new(MajorityLearner::default(), config)
            .unwrap()
            .with_plugin(StopAfterFirstBatch);

        let result = strategy.train(scenario.train_stream().get(0).unwrap()).unwrap();
        assert!(result.stopped_early);
        assert_eq!(result.epoch_losses.len(), 1);
        assert_eq!(strategy.learner().seen_inputs.len(), 4);
    }

    struct MaskedReadCheck;

    impl StrategyPlugin<usize> for MaskedReadCheck {
        fn before_training_exp(&mut self, ctx: &mut StrategyContext<usize>) -> Result<()> {
            let err = ctx.experience.current_experience().unwrap_err();
            assert_eq!(err.kind(), avl_core::ErrorKind::MaskedAttribute);
            Ok(())
        }
    }

    #[test]
    fn test_training_view_masks_experience_index() {
        let scenario = scenario();
        let mut strategy = Strategy::new(MajorityLearner::default(), StrategyConfig::default())
            .unwrap()
            .with_plugin(MaskedReadCheck);
        strategy.train(scenario.train_stream().get(1).unwrap()).unwrap();
    }
}
