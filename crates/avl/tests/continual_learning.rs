//! Integration tests for the continual learning pipeline.
//!
//! These tests build scenarios over synthetic feature data and drive a
//! nearest-class-mean learner through them.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use avl::all::*;

/// Classes sit on the diagonal, `10 * class` apart, with uniform noise.
fn create_synthetic_data(
    n_per_class: usize,
    n_classes: usize,
    seed: u64,
) -> ClassificationDataset<Array1<f32>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_samples = n_per_class * n_classes;

    let mut x_data = Vec::with_capacity(n_samples * 2);
    let mut y_data = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        y_data.push(class as i64);
        for _ in 0..2 {
            x_data.push(class as f32 * 10.0 + rng.gen::<f32>());
        }
    }

    let x = Array2::from_shape_vec((n_samples, 2), x_data).unwrap();
    let source = ArraySource::from_arrays(x, y_data).unwrap();
    ClassificationDataset::from_source(source).unwrap()
}

/// Predicts the class whose running mean is closest.
#[derive(Default)]
struct NearestMean {
    sums: BTreeMap<i64, (Array1<f32>, usize)>,
}

impl NearestMean {
    fn predict(&self, x: &Array1<f32>) -> Option<i64> {
        self.sums
            .iter()
            .map(|(class, (sum, count))| {
                let mean = sum / *count as f32;
                let dist: f32 = (&mean - x).mapv(|v| v * v).sum();
                (*class, dist)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(class, _)| class)
    }

    fn n_correct(&self, batch: &Batch<Array1<f32>, i64>) -> usize {
        batch
            .inputs
            .iter()
            .zip(&batch.targets)
            .filter(|(x, y)| self.predict(x) == Some(**y))
            .count()
    }
}

impl Learner<Array1<f32>> for NearestMean {
    fn train_batch(&mut self, batch: &Batch<Array1<f32>, i64>) -> avl::train::Result<f32> {
        let x = batch.stack_inputs()?;
        let errors = batch.len() - self.n_correct(batch);
        for (row, target) in x.rows().into_iter().zip(&batch.targets) {
            let entry = self
                .sums
                .entry(*target)
                .or_insert_with(|| (Array1::zeros(row.len()), 0));
            entry.0 += &row;
            entry.1 += 1;
        }
        Ok(errors as f32 / batch.len() as f32)
    }

    fn eval_batch(&mut self, batch: &Batch<Array1<f32>, i64>) -> avl::train::Result<BatchOutcome> {
        let n_correct = self.n_correct(batch);
        Ok(BatchOutcome {
            loss: 1.0 - n_correct as f32 / batch.len() as f32,
            n_correct: Some(n_correct),
        })
    }
}

fn scenario() -> NCScenario<Array1<f32>> {
    let config = NCScenarioConfig::new(3).with_seed(0);
    NCScenario::new(
        create_synthetic_data(20, 6, 1),
        create_synthetic_data(5, 6, 2),
        &config,
    )
    .unwrap()
}

#[test]
fn test_class_incremental_pipeline() {
    let scenario = scenario();
    let config = StrategyConfig::default()
        .with_train_mb_size(8)
        .with_train_epochs(1)
        .with_seed(42);
    let mut strategy = Strategy::new(NearestMean::default(), config)
        .unwrap()
        .with_plugin(ProgressPlugin::new())
        .with_plugin(ReplayPlugin::new(10, Seed::new(42)));

    let mut sizes = Vec::new();
    for experience in scenario.train_stream() {
        let result = strategy.train(experience).unwrap();
        assert_eq!(result.epoch_losses.len(), 1);
        sizes.push(result.n_samples);
    }
    assert_eq!(sizes, vec![40, 50, 50]);
    assert_eq!(strategy.learner().sums.len(), 6);

    let results = strategy.eval(scenario.test_stream()).unwrap();
    assert_eq!(results.len(), 3);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.experience, i);
        assert_eq!(result.n_samples, 10);
        assert_eq!(result.accuracy, Some(1.0));
    }
}

#[test]
fn test_training_only_sees_training_attributes() {
    let scenario = scenario();
    let experience = scenario.train_stream().get(2).unwrap();

    let train = experience.train();
    assert_eq!(
        train.current_experience().unwrap_err().kind(),
        ErrorKind::MaskedAttribute
    );
    assert_eq!(train.origin_stream().unwrap_err().kind(), ErrorKind::MaskedAttribute);

    assert_eq!(experience.inference().current_experience().unwrap(), 2);
    let logging = experience.logging();
    assert_eq!(logging.origin_stream().unwrap().name(), "train");
    assert_eq!(train.classes_in_this_experience().len(), 2);
}

#[test]
fn test_reproducibility_round_trip() {
    let scenario = scenario();
    let json = scenario.get_reproducibility_data().to_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["n_experiences"], 3);
    assert_eq!(value["classes_order"].as_array().unwrap().len(), 6);

    let data = ReproducibilityData::from_json(&json).unwrap();
    let replayed = NCScenario::from_reproducibility_data(
        create_synthetic_data(20, 6, 1),
        create_synthetic_data(5, 6, 2),
        data,
    )
    .unwrap();
    assert_eq!(replayed.classes_order(), scenario.classes_order());
    assert_eq!(
        replayed.train_exps_patterns_assignment(),
        scenario.train_exps_patterns_assignment()
    );
    assert_eq!(
        replayed.test_exps_patterns_assignment(),
        scenario.test_exps_patterns_assignment()
    );
}

#[test]
fn test_online_pipeline() {
    let scenario = scenario();
    let online = OnlineCLScenario::new(
        vec![
            scenario.train_stream().clone(),
            scenario.test_stream().clone(),
        ],
        OnlineSplitConfig::new(16),
    )
    .unwrap();

    let config = StrategyConfig::default().with_train_mb_size(4).with_seed(0);
    let mut strategy = Strategy::new(NearestMean::default(), config).unwrap();

    let mut sizes = Vec::new();
    for experience in online.train_stream().unwrap() {
        let experience = experience.unwrap();
        assert_eq!(
            experience.train().is_last_subexp().unwrap_err().kind(),
            ErrorKind::MaskedAttribute
        );
        sizes.push(strategy.train(&experience).unwrap().n_samples);
    }
    assert_eq!(sizes, vec![16, 16, 8, 16, 16, 8, 16, 16, 8]);

    let results = strategy.eval(online.original_stream("test").unwrap()).unwrap();
    assert!(results.iter().all(|r| r.accuracy == Some(1.0)));
}

#[test]
fn test_multi_dataset_pipeline() {
    let first = create_synthetic_data(4, 2, 3);
    let second = create_synthetic_data(4, 2, 4);

    let (train, _, classes) = concat_datasets_sequentially(
        &[first.clone(), second.clone()],
        &[first.clone(), second.clone()],
    )
    .unwrap();
    assert_eq!(train.classes(), vec![0, 1, 2, 3]);
    assert_eq!(classes, vec![vec![0, 1], vec![2, 3]]);

    let scenario = create_multi_dataset_scenario(
        vec![first.clone(), second.clone()],
        vec![first, second],
        &[0, 1],
        false,
    )
    .unwrap();
    let stream = scenario.eager_stream("train").unwrap();
    assert_eq!(stream.len(), 2);

    let mut strategy =
        Strategy::new(NearestMean::default(), StrategyConfig::default().with_seed(5)).unwrap();
    for experience in stream {
        strategy.train(experience).unwrap();
    }
    let results = strategy.eval(scenario.eager_stream("test").unwrap()).unwrap();
    assert_eq!(results[0].task_labels, vec![0]);
    assert_eq!(results[1].task_labels, vec![1]);
    assert!(results.iter().all(|r| r.n_samples == 8));
}
